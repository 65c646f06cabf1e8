//! Escaping for untrusted text.
//!
//! Assistant text comes from a network response and, transitively, from user
//! input reflected by the model. Nothing from it reaches an output sink
//! without passing through one of these functions.

use std::borrow::Cow;

const ESC: char = '\x1b';
const BEL: char = '\x07';

/// Escape text for inclusion in HTML element content or a quoted attribute.
#[must_use]
pub fn escape_html(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 16);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Strip terminal control sequences (CSI, OSC, DCS and friends), C0/C1
/// controls and DEL. Newlines, tabs and carriage returns survive.
#[must_use]
pub fn sanitize_terminal_text(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_disallowed) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ESC => match chars.peek().copied() {
                Some('[') => {
                    chars.next();
                    skip_csi(&mut chars);
                }
                Some(']') => {
                    chars.next();
                    skip_string(&mut chars, true);
                }
                Some('P' | '^' | '_') => {
                    chars.next();
                    skip_string(&mut chars, false);
                }
                Some('(' | ')' | '*' | '+' | '#' | ' ') => {
                    chars.next();
                    chars.next();
                }
                Some('7' | '8' | '=' | '>' | '<' | 'c' | 'D' | 'E' | 'H' | 'M' | 'N' | 'O' | 'Z') => {
                    chars.next();
                }
                _ => {}
            },
            '\u{009b}' => skip_csi(&mut chars),
            c if is_disallowed(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn is_disallowed(c: char) -> bool {
    let c0 = c <= '\x1f' && !matches!(c, '\n' | '\t' | '\r');
    let c1 = ('\u{0080}'..='\u{009f}').contains(&c);
    c0 || c1 || c == '\x7f'
}

/// Consume CSI parameter/intermediate bytes through the final byte.
fn skip_csi<I: Iterator<Item = char>>(chars: &mut std::iter::Peekable<I>) {
    while let Some(&c) = chars.peek() {
        if ('\x20'..='\x3f').contains(&c) {
            chars.next();
        } else {
            if ('\x40'..='\x7e').contains(&c) {
                chars.next();
            }
            return;
        }
    }
}

/// Consume an OSC/DCS/PM/APC payload through its terminator (ST, or BEL for OSC).
fn skip_string<I: Iterator<Item = char>>(chars: &mut std::iter::Peekable<I>, bel_ends: bool) {
    while let Some(c) = chars.next() {
        if bel_ends && c == BEL {
            return;
        }
        if c == ESC && chars.peek() == Some(&'\\') {
            chars.next();
            return;
        }
    }
}
