//! Record identifier generation.
//!
//! Ids are `<millis in base 36><9 random base-36 chars>`. The time part alone
//! collides whenever two records are created in the same millisecond, so the
//! random suffix is what makes ids unique; the time part keeps them roughly
//! sortable by creation.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random suffix appended to every id.
pub const SUFFIX_LEN: usize = 9;

#[derive(Debug, Default)]
pub struct IdGenerator {
    last_millis: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator whose clock already reads `millis`. While the wall clock
    /// is behind it, every id shares the same time component.
    #[cfg(test)]
    pub(crate) fn starting_at(millis: u64) -> Self {
        Self { last_millis: millis }
    }

    /// Returns a fresh id. The time component never goes backwards for a
    /// given generator, even if the wall clock does.
    pub fn next_id(&mut self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        self.last_millis = self.last_millis.max(now);

        let mut id = to_base36(self.last_millis);
        let mut rng = rand::thread_rng();
        for _ in 0..SUFFIX_LEN {
            id.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
        }
        id
    }
}

pub(crate) fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}
