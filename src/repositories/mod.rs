pub mod account_repository;
pub mod journal_repository;
pub mod note_repository;
pub mod payment_repository;
pub mod sequence_repository;

pub use account_repository::AccountRepository;
pub use journal_repository::JournalRepository;
pub use note_repository::NoteRepository;
pub use payment_repository::PaymentRepository;
pub use sequence_repository::SequenceRepository;

/// Builds an `ILIKE` pattern matching `search` anywhere, or `None` for blank input.
pub(crate) fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search?.trim();
    if term.is_empty() {
        return None;
    }
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    Some(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern() {
        assert_eq!(search_pattern(None), None);
        assert_eq!(search_pattern(Some("   ")), None);
        assert_eq!(search_pattern(Some(" cash ")), Some("%cash%".to_string()));
        assert_eq!(search_pattern(Some("10%_a")), Some("%10\\%\\_a%".to_string()));
    }
}
