//! Small IRC string helpers shared by all modules.

/// RFC 1459 casefolding: ASCII uppercase maps to lowercase and the
/// bracket characters `[]\^` map to `{}|~`.
pub fn lower(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'A'..='Z' => (c as u8 + 32) as char,
            '[' => '{',
            '\\' => '|',
            ']' => '}',
            '^' => '~',
            _ => c,
        })
        .collect()
}

/// Nick equality under RFC 1459 casefolding.
pub fn nick_eq(a: &str, b: &str) -> bool {
    lower(a) == lower(b)
}

/// Renders a list for prose: "red", "red and blue", "red, blue, and green".
pub fn comma_and(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{} and {}", a, b),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn casefolding_covers_bracket_pairs() {
        assert_eq!(lower("NiCk[a]^"), "nick{a}~");
        assert!(nick_eq("Bob", "bob"));
        assert!(nick_eq("ba[r]", "ba{r}"));
        assert!(!nick_eq("alice", "bob"));
    }

    #[test]
    fn comma_and_forms() {
        let wires = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(comma_and(&wires(&[])), "");
        assert_eq!(comma_and(&wires(&["red"])), "red");
        assert_eq!(comma_and(&wires(&["red", "blue"])), "red and blue");
        assert_eq!(
            comma_and(&wires(&["red", "blue", "green"])),
            "red, blue, and green"
        );
    }
}
