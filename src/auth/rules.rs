//! Ordered heuristic tables for locating and driving login and registration
//! forms. Every lookup walks its table front to back; the first hit wins.

// ============================================================================
// Login
// ============================================================================

/// A current URL containing one of these is already a login surface.
pub const LOGIN_URL_MARKERS: &[&str] = &["login", "signin", "sign-in", "sign_in"];

pub const LOGIN_PATHS: &[&str] = &[
    "/login",
    "/signin",
    "/sign-in",
    "/auth/login",
    "/account/login",
    "/user/login",
    "/users/sign_in",
];

/// Link or button texts that lead to a login form.
pub const LOGIN_LINK_TEXTS: &[&str] = &["log in", "login", "sign in", "signin"];

pub const IDENTITY_SELECTORS: &[&str] = &[
    "input[type=\"email\"]",
    "input[name=\"email\"]",
    "input[name=\"username\"]",
    "input[name=\"login\"]",
    "input[name=\"user\"]",
    "input[id=\"email\"]",
    "input[id=\"username\"]",
    "input[autocomplete=\"username\"]",
    "input[type=\"text\"]",
];

pub const PASSWORD_SELECTORS: &[&str] = &[
    "input[type=\"password\"]",
    "input[name=\"password\"]",
    "input[id=\"password\"]",
];

pub const SUBMIT_SELECTORS: &[&str] = &[
    "button[type=\"submit\"]",
    "input[type=\"submit\"]",
    "button[name=\"login\"]",
    "button#login",
    "form button",
];

/// Containers that hold an auth error message.
pub const ERROR_SELECTORS: &[&str] = &[
    ".error",
    ".alert-danger",
    ".alert-error",
    "[role=\"alert\"]",
    ".invalid-feedback",
    ".form-error",
    ".error-message",
];

/// Error text that marks a failed login.
pub const LOGIN_ERROR_TEXT: &str = "invalid";

// ============================================================================
// Registration
// ============================================================================

pub const REGISTER_URL_MARKERS: &[&str] = &["register", "signup", "sign-up", "sign_up"];

pub const REGISTER_PATHS: &[&str] = &[
    "/register",
    "/signup",
    "/sign-up",
    "/auth/register",
    "/account/register",
    "/users/sign_up",
    "/join",
];

pub const REGISTER_LINK_TEXTS: &[&str] = &["sign up", "signup", "register", "create account", "join"];

pub const REGISTER_FIELD_SELECTOR: &str = "input, textarea";

pub const REGISTER_SUCCESS_TEXTS: &[&str] = &[
    "registration successful",
    "account created",
    "successfully registered",
    "welcome",
    "thank you for registering",
    "verify your email",
    "check your email",
];

/// Checkboxes whose identifier contains one of these are ticked.
pub const CONSENT_MARKERS: &[&str] = &["terms", "agree", "accept"];

/// What a registration input asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationField {
    ConfirmPassword,
    Password,
    Email,
    FirstName,
    LastName,
    Username,
    Phone,
    FullName,
}

/// Identifier fragments per field kind. Order matters: confirm-password
/// before password, username and first/last name before the generic name.
pub const REGISTRATION_FIELD_RULES: &[(&[&str], RegistrationField)] = &[
    (
        &["confirm", "password_confirmation", "repeat", "retype", "password2"],
        RegistrationField::ConfirmPassword,
    ),
    (&["password", "passwd"], RegistrationField::Password),
    (&["email", "e-mail"], RegistrationField::Email),
    (&["first", "fname", "given"], RegistrationField::FirstName),
    (&["last", "lname", "surname", "family"], RegistrationField::LastName),
    (&["username", "user_name", "login", "handle"], RegistrationField::Username),
    (&["phone", "mobile", "tel"], RegistrationField::Phone),
    (&["name"], RegistrationField::FullName),
];

/// Classify a registration input from its lowercased name, placeholder and
/// id. Password-typed inputs without a telling identifier count as
/// passwords.
pub fn classify_registration_field(identifier: &str, input_type: &str) -> Option<RegistrationField> {
    let identifier = identifier.to_lowercase();
    let matched = REGISTRATION_FIELD_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| identifier.contains(n)))
        .map(|(_, field)| *field);

    match (matched, input_type) {
        (Some(RegistrationField::ConfirmPassword), _) => Some(RegistrationField::ConfirmPassword),
        (_, "password") => Some(RegistrationField::Password),
        (_, "email") => Some(RegistrationField::Email),
        (m, _) => m,
    }
}

pub fn is_consent_checkbox(identifier: &str) -> bool {
    let identifier = identifier.to_lowercase();
    CONSENT_MARKERS.iter().any(|m| identifier.contains(m))
}

/// Case-insensitive keyword match on a link or button text.
pub fn text_matches(text: &str, keywords: &[&str]) -> bool {
    let lower = text.trim().to_lowercase();
    !lower.is_empty() && keywords.iter().any(|k| lower.contains(k))
}
