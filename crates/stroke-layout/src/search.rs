//! Search state shared between a search field and the controls that
//! highlight its matches.

use stroke_core::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
}

pub struct SearchState {
    pub text: String,
    pub direction: SearchDirection,
    pub ignore_case: Filter,
}

impl SearchState {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            direction: SearchDirection::Forward,
            ignore_case: Filter::never(),
        }
    }

    pub fn with_ignore_case(mut self, ignore_case: Filter) -> Self {
        self.ignore_case = ignore_case;
        self
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new()
    }
}
