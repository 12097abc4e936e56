//! Transcript pagination.

/// Greedily slice `text` into consecutive chunks of at most `limit`
/// characters, preserving order, dropping nothing.
///
/// Empty input yields a single empty chunk so callers always have something
/// to post. A zero limit is clamped to one; it would otherwise never advance.
pub fn paginate(text: &str, limit: usize) -> Paginate<'_> {
    Paginate {
        rest: Some(text),
        limit: limit.max(1),
    }
}

/// Lazy iterator over transcript chunks. Single forward pass, splits on
/// character boundaries.
pub struct Paginate<'a> {
    rest: Option<&'a str>,
    limit: usize,
}

impl<'a> Iterator for Paginate<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest.take()?;
        match rest.char_indices().nth(self.limit) {
            Some((split, _)) => {
                let (chunk, tail) = rest.split_at(split);
                self.rest = Some(tail);
                Some(chunk)
            },
            None => Some(rest),
        }
    }
}
