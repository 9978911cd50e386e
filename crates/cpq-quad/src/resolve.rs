//! Label resolution: the post-pass that rewrites symbolic labels into
//! absolute 1-based line numbers.

use std::collections::HashMap;

use crate::instruction::Operand;
use crate::program::{Line, Program};

/// Resolve every symbolic label to the 1-based number of the first
/// instruction line after it, then delete the label lines. A label at
/// the very end of the program resolves to one past the last line,
/// which is where the driver places `HALT`.
///
/// Idempotent on programs that contain no label syntax.
pub fn resolve_labels(program: Program) -> Program {
    let mut targets = HashMap::new();
    let mut effective = 0usize;
    for line in &program.lines {
        match line {
            Line::Label(n) => {
                targets.insert(*n, effective + 1);
            }
            Line::Instruction(_) => effective += 1,
        }
    }

    let lines = program
        .lines
        .into_iter()
        .filter_map(|line| match line {
            Line::Label(_) => None,
            Line::Instruction(mut instruction) => {
                for operand in &mut instruction.operands {
                    if let Operand::Label(n) = operand {
                        if let Some(&target) = targets.get(n) {
                            *operand = Operand::Line(target);
                        }
                    }
                }
                Some(Line::Instruction(instruction))
            }
        })
        .collect();

    Program { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Opcode;

    #[test]
    fn forward_and_backward_jumps() {
        let mut program = Program::new();
        program.emit_label(1);
        program.emit(Opcode::Ieql, vec![Operand::Temp(1), Operand::Int(0), Operand::Int(1)]);
        program.emit(Opcode::Jmpz, vec![Operand::Label(2), Operand::Temp(1)]);
        program.emit(Opcode::Iinp, vec![Operand::Var("x".into())]);
        program.emit(Opcode::Jump, vec![Operand::Label(1)]);
        program.emit_label(2);

        let resolved = resolve_labels(program);
        assert_eq!(
            resolved.to_string(),
            "IEQL $t1 0 1\nJMPZ 5 $t1\nIINP x\nJUMP 1\n"
        );
    }

    #[test]
    fn adjacent_labels_share_a_target() {
        let mut program = Program::new();
        program.emit(Opcode::Jump, vec![Operand::Label(1)]);
        program.emit(Opcode::Jump, vec![Operand::Label(2)]);
        program.emit_label(2);
        program.emit_label(1);
        program.emit(Opcode::Iinp, vec![Operand::Var("x".into())]);

        let resolved = resolve_labels(program);
        assert_eq!(resolved.to_string(), "JUMP 3\nJUMP 3\nIINP x\n");
    }

    #[test]
    fn trailing_label_points_one_past_the_end() {
        let mut program = Program::new();
        program.emit(Opcode::Jump, vec![Operand::Label(1)]);
        program.emit_label(1);

        let resolved = resolve_labels(program);
        assert_eq!(resolved.to_string(), "JUMP 2\n");
    }

    #[test]
    fn labels_do_not_clash_on_shared_prefixes() {
        // @1 and @10 must resolve independently.
        let mut program = Program::new();
        program.emit(Opcode::Jump, vec![Operand::Label(10)]);
        program.emit_label(1);
        program.emit(Opcode::Jump, vec![Operand::Label(1)]);
        program.emit_label(10);
        program.emit(Opcode::Iinp, vec![Operand::Var("x".into())]);

        let resolved = resolve_labels(program);
        assert_eq!(resolved.to_string(), "JUMP 3\nJUMP 2\nIINP x\n");
    }

    #[test]
    fn idempotent_without_labels() {
        let mut program = Program::new();
        program.emit(
            Opcode::Iadd,
            vec![Operand::Temp(1), Operand::Int(5), Operand::Var("x".into())],
        );
        program.emit(Opcode::Iasn, vec![Operand::Var("x".into()), Operand::Temp(1)]);

        let once = resolve_labels(program);
        let twice = resolve_labels(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn float_operands_render_with_six_digits() {
        let mut program = Program::new();
        program.emit(Opcode::Rasn, vec![Operand::Var("x".into()), Operand::Float(16.5)]);
        assert_eq!(program.to_string(), "RASN x 16.500000\n");
    }
}
