//! Name conversions used to derive resource names, script file names and
//! environment variable names from extension and parameter names.
//!
//! Words are split on any non-alphanumeric character and on lower-to-upper
//! case transitions, so `CheeseBoard`, `cheese-board`, `cheese_board` and
//! `cheese board` all split into `["cheese", "board"]`.

/// Split an identifier into lowercase words.
fn words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    let chars: Vec<char> = input.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev = None;
            continue;
        }

        if let Some(p) = prev {
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            // "fooBar" and the "B" in "HTTPBar" start a new word
            let boundary = c.is_ascii_uppercase()
                && (p.is_ascii_lowercase()
                    || p.is_ascii_digit()
                    || (p.is_ascii_uppercase() && next_is_lower));
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(c.to_ascii_lowercase());
        prev = Some(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `CheeseBoard` -> `cheese_board`
pub fn snake_case(input: &str) -> String {
    words(input).join("_")
}

/// `CheeseBoard` -> `cheese-board`
pub fn kebab_case(input: &str) -> String {
    words(input).join("-")
}

/// `cheeseBoard` -> `CHEESE_BOARD`
pub fn upper_snake_case(input: &str) -> String {
    snake_case(input).to_ascii_uppercase()
}
