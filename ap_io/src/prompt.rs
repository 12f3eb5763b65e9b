use std::io::{BufRead, StdinLock};

use ap_core::MediaPrompt;

/// Waits for one line of operator input and assumes the medium was inserted.
pub struct LinePrompt<R> {
    input: R,
}

impl LinePrompt<StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin().lock())
    }
}

impl<R: BufRead> LinePrompt<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> MediaPrompt for LinePrompt<R> {
    fn prompt_for_medium(&mut self) -> bool {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => tracing::debug!("input closed while waiting for medium; continuing"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "failed to read operator input; continuing"),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn consumes_exactly_one_line() {
        let mut input = Cursor::new(b"\nleft over\n".to_vec());
        {
            let mut prompt = LinePrompt::new(&mut input);
            assert!(prompt.prompt_for_medium());
        }
        let mut rest = String::new();
        input.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "left over\n");
    }

    #[test]
    fn proceeds_on_closed_input() {
        let mut prompt = LinePrompt::new(Cursor::new(Vec::new()));
        assert!(prompt.prompt_for_medium());
    }
}
