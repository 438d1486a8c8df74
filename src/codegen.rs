use crate::error::CompileError;
use crate::sexpr::{self, Node};

pub mod dest;
pub mod listing;
pub mod symtab;

use dest::{BranchTarget, ControlDest, DataDest, LocalLabel};
use listing::Listing;
use symtab::SymbolTable;

/// First id handed out for generator-allocated local labels.
const FIRST_LABEL: u32 = 100;

/// Operator families routed through the shared binary-operand policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alu {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Mul,
    Div,
}

/// Single-pass destination-driven code generator.
///
/// Every recursive [`CodeGen::form`] call receives the place its value must
/// end up (a [`DataDest`]) and the control transfer that must follow (a
/// [`ControlDest`]), and selects instructions that satisfy both at once.
/// The contextual selection stands in for a separate optimization pass:
/// tail positions become jumps, predicates become flag tests, and operands
/// land in the registers their operators want.
#[derive(Debug)]
pub struct CodeGen {
    listing: Listing,
    globals: SymbolTable,
    next_label: u32,
}

impl Default for CodeGen {
    fn default() -> Self {
        CodeGen::new()
    }
}

impl CodeGen {
    pub fn new() -> CodeGen {
        CodeGen {
            listing: Listing::new(),
            globals: SymbolTable::new(),
            next_label: FIRST_LABEL,
        }
    }

    /// The lines emitted so far.
    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    /// Consume the generator and render the listing.
    pub fn finish(self) -> String {
        self.listing.to_string()
    }

    /// Generate one form with its value routed to `dd` and `cd` realized
    /// afterwards.
    pub fn form(&mut self, node: &Node, dd: DataDest, cd: ControlDest) -> Result<(), CompileError> {
        if dd == DataDest::ZFlag {
            // Materialize into HL, then fold the halves so Z reflects == 0.
            self.form(node, DataDest::HL, ControlDest::Next)?;
            self.listing.inst("LD", "A,L");
            self.listing.inst("OR", "A,H");
            self.goto(cd);
            return Ok(());
        }
        match node {
            Node::Pair(head, tail) => {
                let Some(name) = head.as_atom() else {
                    return Err(CompileError::UnsupportedForm(head.to_string()));
                };
                match name {
                    "+" => self.binary(tail, name, dd, cd, Alu::Add),
                    "-" => self.binary(tail, name, dd, cd, Alu::Sub),
                    "*" => self.binary(tail, name, dd, cd, Alu::Mul),
                    "/" => self.binary(tail, name, dd, cd, Alu::Div),
                    "&" => self.binary(tail, name, dd, cd, Alu::And),
                    "|" => self.binary(tail, name, dd, cd, Alu::Or),
                    "^" => self.binary(tail, name, dd, cd, Alu::Xor),
                    "int16" => self.declare_words(tail),
                    "set" => self.assign(tail, dd, cd),
                    "if" => self.conditional(tail, dd, cd),
                    "sub" => self.subroutine(tail, dd),
                    "do" => self.statements(tail, dd, cd),
                    "@" => self.address_of(tail, dd, cd),
                    "peek" => self.read_memory(tail, dd, cd),
                    "poke" => self.write_memory(tail, cd),
                    "input" => self.read_port(tail, dd, cd),
                    "output" => self.write_port(tail, cd),
                    "highbyte" => self.high_byte(tail, cd),
                    "lowbyte" => self.low_byte(tail, cd),
                    ">>" => self.shift(tail, name, cd, [("SRL", "H"), ("RL", "L")]),
                    "<<" => self.shift(tail, name, cd, [("SLA", "L"), ("RL", "H")]),
                    _ => {
                        if !self.globals.contains(name) {
                            Err(CompileError::UnsupportedForm(name.to_string()))
                        } else if !tail.is_nil() {
                            Err(CompileError::SubArguments(name.to_string()))
                        } else {
                            self.subroutine_call(name, cd)
                        }
                    }
                }
            }
            Node::Atom(lexeme) => {
                if sexpr::is_literal(lexeme) {
                    let value = sexpr::parse_literal(lexeme)?;
                    self.load_imm(dd, &value.to_string())?;
                } else if self.globals.contains(lexeme) {
                    self.load_global(dd, lexeme)?;
                } else {
                    return Err(CompileError::UndeclaredSymbol(lexeme.clone()));
                }
                self.goto(cd);
                Ok(())
            }
            Node::Nil => Err(CompileError::UnsupportedForm(node.to_string())),
        }
    }

    /// `(op A B)` — route the operands to HL and DE, then apply the
    /// operator. Evaluating a compound first operand can clobber DE, so in
    /// that case the second operand waits on the stack instead.
    fn binary(
        &mut self,
        tail: &Node,
        head: &str,
        dd: DataDest,
        cd: ControlDest,
        op: Alu,
    ) -> Result<(), CompileError> {
        let [first, second]: [&Node; 2] = operands(tail, head)?;
        if first.is_pair() {
            self.form(second, DataDest::HL, ControlDest::Next)?;
            self.listing.inst("PUSH", "HL");
            self.form(first, DataDest::HL, ControlDest::Next)?;
            self.listing.inst("POP", "DE");
        } else {
            self.form(second, DataDest::DE, ControlDest::Next)?;
            self.form(first, DataDest::HL, ControlDest::Next)?;
        }
        match op {
            Alu::Add => self.add16(dd, DataDest::HL, DataDest::DE, cd),
            Alu::Sub => self.alu16(dd, DataDest::HL, DataDest::DE, "SUB", "SBC", cd),
            Alu::And => self.alu16(dd, DataDest::HL, DataDest::DE, "AND", "AND", cd),
            Alu::Or => self.alu16(dd, DataDest::HL, DataDest::DE, "OR", "OR", cd),
            Alu::Xor => self.alu16(dd, DataDest::HL, DataDest::DE, "XOR", "XOR", cd),
            Alu::Mul => self.helper_call("multiply", dd, DataDest::HL, DataDest::DE, cd),
            Alu::Div => self.helper_call("divide", dd, DataDest::HL, DataDest::DE, cd),
        }
    }

    /// 16-bit addition, with a single `ADD HL,rr` when the destination and
    /// one source are both HL.
    fn add16(
        &mut self,
        dd: DataDest,
        ds1: DataDest,
        ds2: DataDest,
        cd: ControlDest,
    ) -> Result<(), CompileError> {
        if dd == DataDest::HL && ds1 == DataDest::HL {
            self.listing.inst("ADD", format!("HL,{}", reg_of(ds2)?));
        } else if dd == DataDest::HL && ds2 == DataDest::HL {
            self.listing.inst("ADD", format!("HL,{}", reg_of(ds1)?));
        } else {
            return self.alu16(dd, ds1, ds2, "ADD", "ADC", cd);
        }
        self.goto(cd);
        Ok(())
    }

    /// Byte-wise 16-bit ALU pattern: the low bytes combine through `A` with
    /// `lo_op`, the high bytes with the carry-aware `hi_op`. An accumulator
    /// destination gets only the low-byte triplet.
    fn alu16(
        &mut self,
        dd: DataDest,
        ds1: DataDest,
        ds2: DataDest,
        lo_op: &str,
        hi_op: &str,
        cd: ControlDest,
    ) -> Result<(), CompileError> {
        let (s1_hi, s1_lo) = halves_of(ds1)?;
        let (s2_hi, s2_lo) = halves_of(ds2)?;
        self.listing.inst("LD", format!("A,{s1_lo}"));
        self.listing.inst(lo_op, format!("A,{s2_lo}"));
        if dd != DataDest::A {
            let (dst_hi, dst_lo) = halves_of(dd)?;
            self.listing.inst("LD", format!("{dst_lo},A"));
            self.listing.inst("LD", format!("A,{s1_hi}"));
            self.listing.inst(hi_op, format!("A,{s2_hi}"));
            self.listing.inst("LD", format!("{dst_hi},A"));
        }
        self.goto(cd);
        Ok(())
    }

    /// Multiply and divide delegate to runtime routines named after their
    /// source registers. In tail position with the result already routed to
    /// HL, the call becomes a jump.
    fn helper_call(
        &mut self,
        base: &str,
        dd: DataDest,
        ds1: DataDest,
        ds2: DataDest,
        cd: ControlDest,
    ) -> Result<(), CompileError> {
        let name = format!("{base}_{}_{}", reg_of(ds1)?, reg_of(ds2)?);
        if cd == ControlDest::Ret && dd == DataDest::HL {
            self.listing.inst("JP", name);
            return Ok(());
        }
        self.listing.inst("CALL", name);
        self.move16(dd, DataDest::HL)?;
        self.goto(cd);
        Ok(())
    }

    /// `CALL` in fall-through position; a `JP` tail call when the caller's
    /// continuation is a return.
    fn subroutine_call(&mut self, name: &str, cd: ControlDest) -> Result<(), CompileError> {
        if cd == ControlDest::Ret {
            self.listing.inst("JP", name);
        } else {
            self.listing.inst("CALL", name);
            self.goto(cd);
        }
        Ok(())
    }

    /// `(int16 NAME …)` — declare zero-initialized global words. Emits only
    /// data lines; the surrounding destinations do not apply to
    /// declarations.
    fn declare_words(&mut self, tail: &Node) -> Result<(), CompileError> {
        for name_node in tail.iter() {
            let name = symbol(name_node, "int16")?;
            self.globals.declare(name)?;
            self.listing.label(name);
            self.listing.inst("DEFW", "0");
        }
        Ok(())
    }

    /// `(set VAR EXPR)` — store EXPR into the variable and leave the value
    /// in the caller's destination.
    fn assign(&mut self, tail: &Node, dd: DataDest, cd: ControlDest) -> Result<(), CompileError> {
        let [var, expr]: [&Node; 2] = operands(tail, "set")?;
        let name = symbol(var, "set")?;
        self.form(expr, DataDest::HL, ControlDest::Next)?;
        self.listing.inst("LD", format!("({name}),HL"));
        self.move16(dd, DataDest::HL)?;
        self.goto(cd);
        Ok(())
    }

    /// `(if PRED CONSEQ)` / `(if PRED CONSEQ ALT)` — the predicate runs as
    /// a Z-flag computation feeding a two-way branch.
    fn conditional(
        &mut self,
        tail: &Node,
        dd: DataDest,
        cd: ControlDest,
    ) -> Result<(), CompileError> {
        let parts: Vec<&Node> = tail.iter().collect();
        let (pred, conseq, alter) = match parts[..] {
            [pred, conseq] => (pred, conseq, None),
            [pred, conseq, alter] => (pred, conseq, Some(alter)),
            _ => {
                return Err(CompileError::MissingOperand {
                    form: "if".into(),
                    expected: format!("2 or 3 operands, found {}", parts.len()),
                })
            }
        };
        let label_false = self.fresh_label();
        match alter {
            None => {
                if cd == ControlDest::Ret {
                    // The false branch folds into a conditional return; no
                    // label needed in tail position.
                    let skip = ControlDest::Branch(BranchTarget::Next, BranchTarget::Ret);
                    self.form(pred, DataDest::ZFlag, skip)?;
                    self.form(conseq, dd, cd)?;
                } else {
                    let skip =
                        ControlDest::Branch(BranchTarget::Next, BranchTarget::Label(label_false));
                    self.form(pred, DataDest::ZFlag, skip)?;
                    self.form(conseq, dd, cd)?;
                    self.place(label_false);
                    self.goto(cd);
                }
            }
            Some(alter) => {
                let label_end = self.fresh_label();
                let skip =
                    ControlDest::Branch(BranchTarget::Next, BranchTarget::Label(label_false));
                self.form(pred, DataDest::ZFlag, skip)?;
                self.form(conseq, dd, ControlDest::Label(label_end))?;
                self.place(label_false);
                self.form(alter, dd, ControlDest::Next)?;
                self.place(label_end);
                self.goto(cd);
            }
        }
        Ok(())
    }

    /// `(sub NAME S1 …)` — declare the name, place its label, and generate
    /// the body with a return as the final transfer.
    fn subroutine(&mut self, tail: &Node, dd: DataDest) -> Result<(), CompileError> {
        let (name_node, body) = match tail {
            Node::Pair(car, cdr) => (car.as_ref(), cdr.as_ref()),
            _ => {
                return Err(CompileError::MissingOperand {
                    form: "sub".into(),
                    expected: "a name".into(),
                })
            }
        };
        let name = symbol(name_node, "sub")?;
        self.globals.declare(name)?;
        self.listing.label(name);
        self.statements(body, dd, ControlDest::Ret)
    }

    /// Generate a statement sequence. Every statement but the last runs for
    /// value into HL with fall-through; the last inherits the enclosing
    /// destinations, so a subroutine's final statement can return or
    /// tail-jump directly.
    fn statements(&mut self, body: &Node, dd: DataDest, cd: ControlDest) -> Result<(), CompileError> {
        let stmts: Vec<&Node> = body.iter().collect();
        match stmts.split_last() {
            None => {
                self.goto(cd);
                Ok(())
            }
            Some((last, init)) => {
                for stmt in init {
                    self.form(stmt, DataDest::HL, ControlDest::Next)?;
                }
                self.form(last, dd, cd)
            }
        }
    }

    /// `(@ NAME)` — the address of a declared variable or subroutine, as an
    /// immediate label reference.
    fn address_of(&mut self, tail: &Node, dd: DataDest, cd: ControlDest) -> Result<(), CompileError> {
        let [name_node]: [&Node; 1] = operands(tail, "@")?;
        let name = symbol(name_node, "@")?;
        if !self.globals.contains(name) {
            return Err(CompileError::UndeclaredSymbol(name.to_string()));
        }
        self.load_imm(dd, name)?;
        self.goto(cd);
        Ok(())
    }

    /// `(peek SIZE ADDR)` — load from memory through a pointer register.
    fn read_memory(&mut self, tail: &Node, dd: DataDest, cd: ControlDest) -> Result<(), CompileError> {
        let [size, addr]: [&Node; 2] = operands(tail, "peek")?;
        match symbol(size, "peek")? {
            "byte" => {
                self.form(addr, DataDest::HL, ControlDest::Next)?;
                match dd {
                    DataDest::A => self.listing.inst("LD", "A,(HL)"),
                    DataDest::B => {
                        self.listing.inst("LD", "A,(HL)");
                        self.listing.inst("LD", "B,A");
                    }
                    _ => {
                        let (hi, lo) = halves_of(dd)?;
                        self.listing.inst("LD", format!("{lo},(HL)"));
                        self.listing.inst("LD", format!("{hi},0"));
                    }
                }
            }
            "word" => {
                // The pointer rides in whichever pair the destination
                // leaves free.
                let ptr = if dd == DataDest::HL {
                    DataDest::DE
                } else {
                    DataDest::HL
                };
                self.form(addr, ptr, ControlDest::Next)?;
                let src = reg_of(ptr)?;
                match dd {
                    // A word read truncated to a byte by the destination.
                    DataDest::A => self.listing.inst("LD", format!("A,({src})")),
                    DataDest::B => {
                        self.listing.inst("LD", format!("A,({src})"));
                        self.listing.inst("LD", "B,A");
                    }
                    _ => {
                        let (hi, lo) = halves_of(dd)?;
                        self.listing.inst("LD", format!("{lo},({src})"));
                        self.listing.inst("INC", src);
                        self.listing.inst("LD", format!("{hi},({src})"));
                    }
                }
            }
            other => return Err(CompileError::UnsupportedSize(other.to_string())),
        }
        self.goto(cd);
        Ok(())
    }

    /// `(poke SIZE ADDR DATUM)` — store to memory through HL.
    fn write_memory(&mut self, tail: &Node, cd: ControlDest) -> Result<(), CompileError> {
        let [size, addr, datum]: [&Node; 3] = operands(tail, "poke")?;
        match symbol(size, "poke")? {
            "byte" => {
                self.form(addr, DataDest::HL, ControlDest::Next)?;
                self.form(datum, DataDest::A, ControlDest::Next)?;
                self.listing.inst("LD", "(HL),A");
            }
            "word" => {
                if !addr.is_pair() {
                    self.form(datum, DataDest::DE, ControlDest::Next)?;
                    self.form(addr, DataDest::HL, ControlDest::Next)?;
                } else {
                    self.form(datum, DataDest::HL, ControlDest::Next)?;
                    self.listing.inst("PUSH", "HL");
                    self.form(addr, DataDest::HL, ControlDest::Next)?;
                    self.listing.inst("POP", "DE");
                }
                self.listing.inst("LD", "A,E");
                self.listing.inst("LD", "(HL),A");
                self.listing.inst("INC", "HL");
                self.listing.inst("LD", "A,D");
                self.listing.inst("LD", "(HL),A");
            }
            other => return Err(CompileError::UnsupportedSize(other.to_string())),
        }
        self.goto(cd);
        Ok(())
    }

    /// `(input SIZE PORT)` — read from a Z80 I/O port addressed by BC.
    fn read_port(&mut self, tail: &Node, dd: DataDest, cd: ControlDest) -> Result<(), CompileError> {
        let [size, port]: [&Node; 2] = operands(tail, "input")?;
        match symbol(size, "input")? {
            "byte" => {
                self.form(port, DataDest::BC, ControlDest::Next)?;
                self.listing.inst("IN", "A,(C)");
                match dd {
                    DataDest::A => {}
                    DataDest::B => self.listing.inst("LD", "B,A"),
                    _ => {
                        let (hi, lo) = halves_of(dd)?;
                        self.listing.inst("LD", format!("{lo},A"));
                        self.listing.inst("LD", format!("{hi},0"));
                    }
                }
            }
            "word" => {
                // A destination of BC collides with the port register; the
                // word assembles in HL and moves over afterwards.
                let target = if dd == DataDest::BC { DataDest::HL } else { dd };
                self.form(port, DataDest::BC, ControlDest::Next)?;
                match target {
                    // A word read truncated to a byte by the destination.
                    DataDest::A => self.listing.inst("IN", "A,(C)"),
                    DataDest::B => {
                        self.listing.inst("IN", "A,(C)");
                        self.listing.inst("LD", "B,A");
                    }
                    _ => {
                        let (hi, lo) = halves_of(target)?;
                        self.listing.inst("IN", "A,(C)");
                        self.listing.inst("LD", format!("{lo},A"));
                        self.listing.inst("INC", "BC");
                        self.listing.inst("IN", "A,(C)");
                        self.listing.inst("LD", format!("{hi},A"));
                    }
                }
                if dd == DataDest::BC {
                    self.listing.inst("LD", "B,H");
                    self.listing.inst("LD", "C,L");
                }
            }
            other => return Err(CompileError::UnsupportedSize(other.to_string())),
        }
        self.goto(cd);
        Ok(())
    }

    /// `(output SIZE PORT DATUM)` — write to a Z80 I/O port addressed by
    /// BC.
    fn write_port(&mut self, tail: &Node, cd: ControlDest) -> Result<(), CompileError> {
        let [size, port, datum]: [&Node; 3] = operands(tail, "output")?;
        match symbol(size, "output")? {
            "byte" => {
                self.form(port, DataDest::BC, ControlDest::Next)?;
                self.form(datum, DataDest::A, ControlDest::Next)?;
                self.listing.inst("OUT", "(C),A");
            }
            "word" => {
                if !port.is_pair() {
                    self.form(datum, DataDest::DE, ControlDest::Next)?;
                    self.form(port, DataDest::BC, ControlDest::Next)?;
                } else {
                    self.form(datum, DataDest::HL, ControlDest::Next)?;
                    self.listing.inst("PUSH", "HL");
                    self.form(port, DataDest::BC, ControlDest::Next)?;
                    self.listing.inst("POP", "DE");
                }
                self.listing.inst("LD", "A,E");
                self.listing.inst("OUT", "(C),A");
                self.listing.inst("INC", "BC");
                self.listing.inst("LD", "A,D");
                self.listing.inst("OUT", "(C),A");
            }
            other => return Err(CompileError::UnsupportedSize(other.to_string())),
        }
        self.goto(cd);
        Ok(())
    }

    /// `(highbyte EXPR)` — the operand's high byte, zero-extended in HL.
    fn high_byte(&mut self, tail: &Node, cd: ControlDest) -> Result<(), CompileError> {
        let [expr]: [&Node; 1] = operands(tail, "highbyte")?;
        self.form(expr, DataDest::HL, ControlDest::Next)?;
        self.listing.inst("LD", "L,H");
        self.listing.inst("LD", "H,0");
        self.goto(cd);
        Ok(())
    }

    /// `(lowbyte EXPR)` — the operand's low byte, zero-extended in HL.
    fn low_byte(&mut self, tail: &Node, cd: ControlDest) -> Result<(), CompileError> {
        let [expr]: [&Node; 1] = operands(tail, "lowbyte")?;
        self.form(expr, DataDest::HL, ControlDest::Next)?;
        self.listing.inst("LD", "H,0");
        self.goto(cd);
        Ok(())
    }

    /// `(>> EXPR COUNT)` / `(<< EXPR COUNT)` — shift the value in HL. A
    /// small literal count unrolls the per-bit step; anything else loops on
    /// B with DJNZ, guarded against a zero count when the count is not
    /// known.
    fn shift(
        &mut self,
        tail: &Node,
        head: &str,
        cd: ControlDest,
        step: [(&'static str, &'static str); 2],
    ) -> Result<(), CompileError> {
        let [expr, count]: [&Node; 2] = operands(tail, head)?;
        let known = match count.as_atom() {
            Some(lexeme) if sexpr::starts_with_digit(lexeme) => {
                Some(sexpr::parse_number(lexeme)?)
            }
            _ => None,
        };

        self.form(expr, DataDest::HL, ControlDest::Next)?;
        match known {
            Some(n) if n <= 4 => {
                for _ in 0..n {
                    self.listing.inst(step[0].0, step[0].1);
                    self.listing.inst(step[1].0, step[1].1);
                }
            }
            _ => {
                let loopback = self.fresh_label();
                self.form(count, DataDest::B, ControlDest::Next)?;
                let skip = if known.is_none() {
                    let skip = self.fresh_label();
                    self.listing.inst("LD", "A,B");
                    self.listing.inst("OR", "A,A");
                    self.listing.inst("JZ", skip.to_string());
                    Some(skip)
                } else {
                    None
                };
                self.place(loopback);
                self.listing.inst(step[0].0, step[0].1);
                self.listing.inst(step[1].0, step[1].1);
                self.listing.inst("DJNZ", loopback.to_string());
                if let Some(skip) = skip {
                    self.place(skip);
                }
            }
        }
        self.goto(cd);
        Ok(())
    }

    /// Immediate load into a register destination; the operand may be a
    /// number or a label reference.
    fn load_imm(&mut self, dd: DataDest, imm: &str) -> Result<(), CompileError> {
        let reg = reg_of(dd)?;
        self.listing.inst("LD", format!("{reg},{imm}"));
        Ok(())
    }

    /// Load a declared global into the destination. B takes the value
    /// through the accumulator; everything else loads from memory directly.
    fn load_global(&mut self, dd: DataDest, name: &str) -> Result<(), CompileError> {
        if dd == DataDest::B {
            self.load_global(DataDest::A, name)?;
            self.listing.inst("LD", "B,A");
            return Ok(());
        }
        let reg = reg_of(dd)?;
        self.listing.inst("LD", format!("{reg},({name})"));
        Ok(())
    }

    /// Move a 16-bit value between register destinations, a byte at a
    /// time. Byte destinations receive the low half.
    fn move16(&mut self, dd: DataDest, ds: DataDest) -> Result<(), CompileError> {
        if dd == ds {
            return Ok(());
        }
        let (src_hi, src_lo) = halves_of(ds)?;
        match dd {
            DataDest::A => self.listing.inst("LD", format!("A,{src_lo}")),
            DataDest::B => self.listing.inst("LD", format!("B,{src_lo}")),
            _ => {
                let (dst_hi, dst_lo) = halves_of(dd)?;
                self.listing.inst("LD", format!("{dst_lo},{src_lo}"));
                self.listing.inst("LD", format!("{dst_hi},{src_hi}"));
            }
        }
        Ok(())
    }

    /// Realize a control destination: nothing for fall-through, a return,
    /// a jump, or a Z-flag conditioned two-way transfer.
    fn goto(&mut self, cd: ControlDest) {
        match cd {
            ControlDest::Next => {}
            ControlDest::Ret => self.listing.inst("RET", ""),
            ControlDest::Label(label) => self.listing.inst("JP", label.to_string()),
            ControlDest::Branch(nonzero, zero) => self.branch(nonzero, zero),
        }
    }

    /// The two-way arm matrix. The first arm fires on Z clear, the second
    /// on Z set.
    fn branch(&mut self, nonzero: BranchTarget, zero: BranchTarget) {
        use BranchTarget::{Label, Next, Ret};
        match (nonzero, zero) {
            (Next, Next) => {}
            (Next, Ret) => self.listing.inst("RET", "Z"),
            (Next, Label(zero)) => self.listing.inst("JP", format!("Z,{zero}")),
            (Ret, Next) => self.listing.inst("RET", "NZ"),
            (Ret, Ret) => self.goto(ControlDest::Ret),
            (Ret, other) => {
                self.listing.inst("RET", "NZ");
                self.goto(other.into());
            }
            (Label(nonzero), Next) => self.listing.inst("JP", format!("NZ,{nonzero}")),
            (Label(nonzero), other) => {
                self.listing.inst("JP", format!("NZ,{nonzero}"));
                self.goto(other.into());
            }
        }
    }

    fn fresh_label(&mut self) -> LocalLabel {
        let label = LocalLabel(self.next_label);
        self.next_label += 1;
        label
    }

    fn place(&mut self, label: LocalLabel) {
        self.listing.label(label.to_string());
    }
}

fn reg_of(dd: DataDest) -> Result<&'static str, CompileError> {
    dd.reg_name().ok_or(CompileError::UnsupportedDest(dd))
}

fn halves_of(dd: DataDest) -> Result<(&'static str, &'static str), CompileError> {
    dd.halves().ok_or(CompileError::UnsupportedDest(dd))
}

/// The fixed operand list of a form, with arity checked.
fn operands<'a, const N: usize>(tail: &'a Node, head: &str) -> Result<[&'a Node; N], CompileError> {
    let items: Vec<&Node> = tail.iter().collect();
    let found = items.len();
    items.try_into().map_err(|_| CompileError::MissingOperand {
        form: head.to_string(),
        expected: format!("{N} operands, found {found}"),
    })
}

fn symbol<'a>(node: &'a Node, head: &str) -> Result<&'a str, CompileError> {
    node.as_atom()
        .ok_or_else(|| CompileError::Syntax(format!("`{head}` expects a symbol, found {node}")))
}
