// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plate canonicalization.
//!
//! Stored plates are ASCII-uppercase alphanumeric with separators removed.
//! OCR output may arrive in Devanagari script; the transliteration table
//! below covers the digits and the letter pairs that appear on Nepali
//! plates. The raw OCR text is preserved alongside the canonical form for
//! audit, so canonicalization is allowed to be lossy on characters outside
//! the table.

/// Map raw OCR text to the canonical plate form.
pub fn canonical_plate(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            'a'..='z' => out.push(ch.to_ascii_uppercase()),
            'A'..='Z' | '0'..='9' => out.push(ch),
            // Devanagari digits.
            '\u{0966}'..='\u{096F}' => {
                let digit = (ch as u32 - 0x0966) as u8;
                out.push((b'0' + digit) as char);
            }
            // Devanagari letters seen on plates. A following vowel sign or
            // virama belongs to the same syllable and is consumed with it.
            'ब' => {
                out.push('B');
                if chars.peek() == Some(&'ा') {
                    chars.next();
                    out.push('A');
                }
            }
            'प' => {
                out.push('P');
                if chars.peek() == Some(&'ा') {
                    chars.next();
                    out.push('A');
                }
            }
            'क' => {
                out.push('K');
                if chars.peek() == Some(&'ो') {
                    chars.next();
                    out.push('O');
                }
            }
            'ग' => out.push('G'),
            'च' => out.push('C'),
            'ज' => out.push('J'),
            'न' => out.push('N'),
            'म' => out.push('M'),
            'ल' => out.push('L'),
            'स' => out.push('S'),
            'ह' => out.push('H'),
            // Separators are dropped; anything else outside the table too.
            _ => {}
        }
    }
    out
}

/// Whether a stored plate satisfies the canonical-form contract.
pub fn is_canonical_plate(plate: &str) -> bool {
    !plate.is_empty() && plate.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

#[cfg(test)]
#[path = "plate_tests.rs"]
mod tests;
