//! Character reference decoding for markup text and attribute values.

/// Decodes named and numeric character references.
///
/// Only the references that occur in help-archive markup are recognized.
/// Anything else, including a reference without its terminating `;`, is kept
/// verbatim.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        match decode_reference(tail) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decodes the reference at the start of `input` (which begins with `&`),
/// returning the character and the number of bytes consumed.
fn decode_reference(input: &str) -> Option<(char, usize)> {
    // Longest reference we accept is `&#x10FFFF;`.
    let end = input.char_indices().take(12).find(|(_, c)| *c == ';')?.0;
    let body = &input[1..end];

    let ch = if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        char::from_u32(code)?
    } else {
        named_entity(body)?
    };

    Some((ch, end + 1))
}

fn named_entity(name: &str) -> Option<char> {
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        "deg" => '\u{b0}',
        "plusmn" => '\u{b1}',
        "micro" => '\u{b5}',
        "middot" => '\u{b7}',
        "times" => '\u{d7}',
        "divide" => '\u{f7}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "bull" => '\u{2022}',
        "hellip" => '\u{2026}',
        _ => return None,
    };
    Some(ch)
}
