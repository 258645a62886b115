use validator::ValidateEmail;

pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 255;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 50;
pub const MAX_PICTURE_URL_LEN: usize = 500;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.len() <= MAX_EMAIL_LEN && email.validate_email()
}

/// Emails are unique case-insensitively; every lookup and insert goes through this.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Password policy for new accounts.
/// Rules:
/// - 8-50 characters
/// - At least one lowercase letter, one uppercase letter and one digit
/// - At least one non-alphanumeric symbol
pub fn is_valid_password(password: &str) -> bool {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return false;
    }

    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

pub fn is_valid_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && name.chars().count() <= MAX_NAME_LEN
}
