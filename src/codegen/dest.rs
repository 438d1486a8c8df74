use std::fmt;

/// Where the value of an expression must live when generation of that
/// expression completes.
///
/// The 8-bit destinations carry byte results: `A` is the accumulator, `B`
/// holds shift counts. `BC`, `DE` and `HL` are the 16-bit register pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDest {
    A,
    B,
    BC,
    DE,
    HL,
    /// Top of the intermediate-result stack, spilled to RAM below the top.
    /// Reserved; the current generators never route a value here.
    Tmp,
    /// The value is not materialized into a register. The Z flag reflects
    /// whether the expression evaluated to zero.
    ZFlag,
}

impl DataDest {
    /// Register name as it appears in an operand field, for the
    /// destinations that name a register.
    pub fn reg_name(self) -> Option<&'static str> {
        match self {
            DataDest::A => Some("A"),
            DataDest::B => Some("B"),
            DataDest::BC => Some("BC"),
            DataDest::DE => Some("DE"),
            DataDest::HL => Some("HL"),
            DataDest::Tmp | DataDest::ZFlag => None,
        }
    }

    /// High and low byte registers of a 16-bit pair destination.
    pub fn halves(self) -> Option<(&'static str, &'static str)> {
        match self {
            DataDest::BC => Some(("B", "C")),
            DataDest::DE => Some(("D", "E")),
            DataDest::HL => Some(("H", "L")),
            _ => None,
        }
    }
}

/// Identifier of a generator-allocated local label, rendered `L<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalLabel(pub u32);

impl fmt::Display for LocalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Continuation of one arm of a two-way branch; the restricted subset of
/// control destinations a [`ControlDest::Branch`] arm may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTarget {
    Next,
    Ret,
    Label(LocalLabel),
}

/// What control transfer must have happened when generation of an
/// expression completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlDest {
    /// Fall through; nothing is emitted.
    Next,
    /// Return from the current subroutine.
    Ret,
    /// Unconditional jump to a local label.
    Label(LocalLabel),
    /// Two-way transfer on the Z flag: the first arm is taken when Z is
    /// clear (the value was non-zero), the second when Z is set.
    Branch(BranchTarget, BranchTarget),
}

impl From<BranchTarget> for ControlDest {
    fn from(target: BranchTarget) -> ControlDest {
        match target {
            BranchTarget::Next => ControlDest::Next,
            BranchTarget::Ret => ControlDest::Ret,
            BranchTarget::Label(label) => ControlDest::Label(label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_halves() {
        assert_eq!(DataDest::BC.halves(), Some(("B", "C")));
        assert_eq!(DataDest::DE.halves(), Some(("D", "E")));
        assert_eq!(DataDest::HL.halves(), Some(("H", "L")));
        assert_eq!(DataDest::A.halves(), None);
        assert_eq!(DataDest::ZFlag.halves(), None);
    }

    #[test]
    fn byte_destinations_have_no_halves_but_a_name() {
        assert_eq!(DataDest::A.reg_name(), Some("A"));
        assert_eq!(DataDest::B.reg_name(), Some("B"));
        assert_eq!(DataDest::Tmp.reg_name(), None);
    }

    #[test]
    fn labels_render_with_a_prefix() {
        assert_eq!(LocalLabel(100).to_string(), "L100");
    }
}
