use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Reply to a question. Every question shares this ordered label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Answer {
    Yes = 0,
    No = 1,
    Unsure = 2,
}

impl Answer {
    pub const COUNT: usize = 3;

    pub const ALL: [Answer; Answer::COUNT] = [Answer::Yes, Answer::No, Answer::Unsure];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Answer::Yes),
            1 => Some(Answer::No),
            2 => Some(Answer::Unsure),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Answer::Yes => "Yes",
            Answer::No => "No",
            Answer::Unsure => "Unsure",
        }
    }
}

impl FromStr for Answer {
    type Err = UnknownAnswer;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(Answer::Yes),
            "no" | "n" => Ok(Answer::No),
            "unsure" | "u" | "?" => Ok(Answer::Unsure),
            _ => Err(UnknownAnswer(value.to_string())),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized answer label '{0}'")]
pub struct UnknownAnswer(pub String);

#[cfg(test)]
mod tests {
    use super::Answer;

    #[test]
    fn index_roundtrip() {
        for (i, answer) in Answer::ALL.iter().enumerate() {
            assert_eq!(Answer::from_index(i), Some(*answer));
            assert_eq!(answer.index(), i);
        }
        assert_eq!(Answer::from_index(Answer::COUNT), None);
    }

    #[test]
    fn parses_short_and_long_forms() {
        assert_eq!("y".parse::<Answer>(), Ok(Answer::Yes));
        assert_eq!(" No ".parse::<Answer>(), Ok(Answer::No));
        assert_eq!("UNSURE".parse::<Answer>(), Ok(Answer::Unsure));
        assert!("maybe".parse::<Answer>().is_err());
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&Answer::Unsure).unwrap();
        assert_eq!(json, "\"Unsure\"");
    }
}
