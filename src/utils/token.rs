use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

pub const INVITATION_CODE_LENGTH: usize = 16;
pub const FILE_TOKEN_LENGTH: usize = 16;

/// Random alphanumeric string drawn from the operating system CSPRNG.
pub fn generate_token(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn generate_invitation_code() -> String {
    generate_token(INVITATION_CODE_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_alphanumeric_and_sized() {
        let code = generate_invitation_code();
        assert_eq!(code.len(), INVITATION_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn codes_do_not_repeat() {
        let codes: HashSet<String> = (0..1000).map(|_| generate_invitation_code()).collect();
        assert_eq!(codes.len(), 1000);
    }
}
