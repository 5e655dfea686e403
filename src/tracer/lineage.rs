//! Строки происхождения пучка для проверки когерентности.
//!
//! Происхождение начинается с id излучателя. Каждый сплиттер дописывает
//! `/{splitter}:o` или `/{splitter}:e`, объединитель снимает последний тег.
//! Символы `%`, `/` и `:` в id экранируются.

use std::borrow::Cow;

pub const ORDINARY: char = 'o';
pub const EXTRAORDINARY: char = 'e';

fn escape(id: &str) -> Cow<'_, str> {
    if !id.contains(|c: char| matches!(c, '%' | '/' | ':')) {
        return Cow::Borrowed(id);
    }
    let mut out = String::with_capacity(id.len() + 4);
    for ch in id.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            ':' => out.push_str("%3A"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Происхождение пучка, только что вышедшего из излучателя.
pub fn root(emitter_id: &str) -> String {
    escape(emitter_id).into_owned()
}

pub fn split(parent: &str, splitter_id: &str, branch: char) -> String {
    format!("{}/{}:{}", parent, escape(splitter_id), branch)
}

fn parse_tag(segment: &str) -> Option<(&str, char)> {
    let (splitter, branch) = segment.rsplit_once(':')?;
    let mut chars = branch.chars();
    match (chars.next(), chars.next()) {
        (Some(b @ (ORDINARY | EXTRAORDINARY)), None) => Some((splitter, b)),
        _ => None,
    }
}

/// Снимает последний тег сплиттера, если он есть.
pub fn recombine(lineage: &str) -> String {
    match lineage.rsplit_once('/') {
        Some((prefix, last)) if parse_tag(last).is_some() => prefix.to_string(),
        _ => lineage.to_string(),
    }
}

/// Истина, если пучки прошли один сплиттер по разным плечам и с тех пор
/// не были объединены.
pub fn diverged(a: &str, b: &str) -> bool {
    let mut left = a.split('/');
    let mut right = b.split('/');
    if left.next() != right.next() {
        return false;
    }
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) if x == y => continue,
            (Some(x), Some(y)) => {
                return match (parse_tag(x), parse_tag(y)) {
                    (Some((sx, bx)), Some((sy, by))) => sx == sy && bx != by,
                    _ => false,
                };
            }
            _ => return false,
        }
    }
}
