//! Single-line text input used to add files while the player runs.

#[derive(Debug, Default)]
pub struct Prompt {
    pub is_active: bool,
    input: String,
}

impl Prompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.is_active = true;
        self.input.clear();
    }

    pub fn cancel(&mut self) {
        self.is_active = false;
        self.input.clear();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    /// Close the prompt and return the entered path, or `None` for blank
    /// input.
    ///
    /// The whole line is one path, spaces included. A pair of surrounding
    /// quotes and backslash-escaped spaces, as pasted by terminals on drag
    /// and drop, are unwrapped.
    pub fn submit(&mut self) -> Option<String> {
        self.is_active = false;
        let input = std::mem::take(&mut self.input);
        let path = unquote(input.trim()).replace("\\ ", " ");
        (!path.is_empty()).then_some(path)
    }
}

fn unquote(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}
