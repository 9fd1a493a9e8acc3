//! Machine IR text parser.

use super::{MachineBasicBlock, MachineFunction, MachineInstr, MachineOperand, Opcode, Register};
use crate::target::canonical_register_name;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse every function in `text`.
pub fn parse_functions(text: &str) -> ParseResult<Vec<MachineFunction>> {
    Parser::default().parse(text)
}

#[derive(Default)]
struct Parser {
    functions: Vec<MachineFunction>,
    current: Option<MachineFunction>,
    block: Option<MachineBasicBlock>,
    line: usize,
}

impl Parser {
    fn parse(mut self, text: &str) -> ParseResult<Vec<MachineFunction>> {
        for (idx, raw) in text.lines().enumerate() {
            self.line = idx + 1;
            let line = match raw.find(';') {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();

            if line.is_empty() {
                continue;
            }
            self.parse_line(line)?;
        }

        if let Some(func) = &self.current {
            return Err(self.error(format!("function '{}' is missing its closing '}}'", func.name())));
        }
        Ok(self.functions)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            message: message.into(),
        }
    }

    fn parse_line(&mut self, line: &str) -> ParseResult<()> {
        if let Some(header) = line.strip_suffix('{') {
            return self.begin_function(header.trim());
        }

        if line == "}" {
            return self.end_function();
        }

        if let Some(label) = line.strip_suffix(':') {
            return self.begin_block(label.trim());
        }

        let instr = self.parse_instruction(line)?;
        match self.block.as_mut() {
            Some(block) => {
                block.push(instr);
                Ok(())
            }
            None => Err(self.error("instruction outside of a basic block")),
        }
    }

    fn begin_function(&mut self, name: &str) -> ParseResult<()> {
        if self.current.is_some() {
            return Err(self.error("nested function definition"));
        }
        if !is_identifier(name) {
            return Err(self.error(format!("invalid function name '{name}'")));
        }
        self.current = Some(MachineFunction::new(name));
        Ok(())
    }

    fn end_function(&mut self) -> ParseResult<()> {
        self.flush_block();
        match self.current.take() {
            Some(func) => {
                self.functions.push(func);
                Ok(())
            }
            None => Err(self.error("unexpected '}'")),
        }
    }

    fn begin_block(&mut self, label: &str) -> ParseResult<()> {
        if !is_identifier(label) {
            return Err(self.error(format!("invalid block label '{label}'")));
        }
        let Some(func) = &self.current else {
            return Err(self.error("block label outside of a function"));
        };
        let duplicate = func.block(label).is_some()
            || self.block.as_ref().is_some_and(|b| b.name() == label);
        if duplicate {
            return Err(self.error(format!("duplicate block label '{label}'")));
        }

        self.flush_block();
        self.block = Some(MachineBasicBlock::new(label));
        Ok(())
    }

    fn flush_block(&mut self) {
        if let (Some(block), Some(func)) = (self.block.take(), self.current.as_mut()) {
            func.add_block(block);
        }
    }

    fn parse_instruction(&self, line: &str) -> ParseResult<MachineInstr> {
        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((mnemonic, rest)) => (mnemonic, rest.trim()),
            None => (line, ""),
        };

        let opcode = Opcode::from_mnemonic(mnemonic)
            .ok_or_else(|| self.error(format!("unknown opcode '{mnemonic}'")))?;

        let mut operands = Vec::new();
        if !rest.is_empty() {
            for token in rest.split(',') {
                operands.push(self.parse_operand(token.trim())?);
            }
        }
        Ok(MachineInstr::new(opcode, operands))
    }

    fn parse_operand(&self, token: &str) -> ParseResult<MachineOperand> {
        if token.is_empty() {
            return Err(self.error("empty operand"));
        }

        if let Some(num) = token.strip_prefix('%') {
            return num
                .parse::<u32>()
                .map(|n| MachineOperand::Reg(Register::Virtual(n)))
                .map_err(|_| self.error(format!("invalid virtual register '{token}'")));
        }

        if token.starts_with('$') {
            return self.parse_physical(token).map(MachineOperand::Reg);
        }

        parse_immediate(token)
            .map(MachineOperand::Imm)
            .ok_or_else(|| self.error(format!("invalid operand '{token}'")))
    }

    fn parse_physical(&self, token: &str) -> ParseResult<Register> {
        let canonical = canonical_register_name(token)
            .ok_or_else(|| self.error(format!("unknown register '{token}'")))?;

        // Canonical names are always x<n> or c<n> with n < 32.
        let (bank, num) = canonical.split_at(1);
        let num: u8 = num
            .parse()
            .map_err(|_| self.error(format!("unknown register '{token}'")))?;
        match bank {
            "x" => Ok(Register::Gpr(num)),
            _ => Ok(Register::Cap(num)),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn parse_immediate(token: &str) -> Option<i64> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    // `from_str_radix` takes its own sign, so the digits must start with one.
    let (digits, radix) = match digits.strip_prefix("0x") {
        Some(hex) => (hex, 16),
        None => (digits, 10),
    };
    if !digits.starts_with(|c: char| c.is_digit(radix)) {
        return None;
    }

    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    }
}
