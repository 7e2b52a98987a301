use regex::Regex;

pub fn validate_email(email: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    re.is_match(email)
}

/// Skill names: letters, digits, spaces and a few separators, 2-60 chars.
pub fn validate_skill_name(name: &str) -> bool {
    let re = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 &/+._-]{1,59}$").unwrap();
    re.is_match(name.trim())
}

pub fn validate_password(password: &str) -> bool {
    password.len() >= 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(validate_email("ana@example.com"));
        assert!(validate_email("a.b+tag@sub.domain.io"));
        assert!(!validate_email("not-an-email"));
        assert!(!validate_email("missing@tld"));
    }

    #[test]
    fn skill_names() {
        assert!(validate_skill_name("Guitar"));
        assert!(validate_skill_name("Spanish Conversation"));
        assert!(validate_skill_name("C++ Basics"));
        assert!(!validate_skill_name("x"));
        assert!(!validate_skill_name("  "));
    }

    #[test]
    fn password_length() {
        assert!(validate_password("longenough"));
        assert!(!validate_password("short"));
    }
}
