use std::fmt;

/// One line of the output listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// `NAME:` at column 0.
    Label(String),
    /// Indented instruction; the mnemonic is left-justified in six columns.
    Inst { mnemonic: String, operand: String },
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Label(name) => write!(f, "{name}:"),
            Line::Inst { mnemonic, operand } => write!(f, "    {mnemonic:<6} {operand}"),
        }
    }
}

/// Append-only buffer of emitted assembly lines.
#[derive(Debug, Default)]
pub struct Listing {
    lines: Vec<Line>,
}

impl Listing {
    pub fn new() -> Listing {
        Listing::default()
    }

    pub fn label(&mut self, name: impl Into<String>) {
        self.lines.push(Line::Label(name.into()));
    }

    pub fn inst(&mut self, mnemonic: &str, operand: impl Into<String>) {
        self.lines.push(Line::Inst {
            mnemonic: mnemonic.to_string(),
            operand: operand.into(),
        });
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_sit_at_column_zero() {
        assert_eq!(Line::Label("foo".into()).to_string(), "foo:");
    }

    #[test]
    fn instructions_are_column_formatted() {
        let line = Line::Inst {
            mnemonic: "LD".into(),
            operand: "HL,5".into(),
        };
        assert_eq!(line.to_string(), "    LD     HL,5");
    }

    #[test]
    fn empty_operands_keep_the_column_layout() {
        let line = Line::Inst {
            mnemonic: "RET".into(),
            operand: String::new(),
        };
        assert_eq!(line.to_string(), "    RET    ");
    }

    #[test]
    fn long_mnemonics_stay_one_space_from_the_operand() {
        let line = Line::Inst {
            mnemonic: "DJNZ".into(),
            operand: "L100".into(),
        };
        assert_eq!(line.to_string(), "    DJNZ   L100");
    }

    #[test]
    fn render_emits_one_line_per_entry() {
        let mut listing = Listing::new();
        listing.label("start");
        listing.inst("RET", "");
        assert_eq!(listing.to_string(), "start:\n    RET    \n");
    }
}
