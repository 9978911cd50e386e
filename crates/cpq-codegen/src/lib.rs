//! QUAD code generation from the CPL AST.
//!
//! A single depth-first walk over a parsed program. The generator keeps
//! the symbol table (filled exclusively from the declaration section),
//! the monotone temporary and label counters, and the stack of break
//! targets for enclosing `while`/`switch` constructs. Semantic errors
//! accumulate; generation keeps going where it sensibly can, so one run
//! surfaces as many problems as possible. Emitted jumps target symbolic
//! labels; [`cpq_quad::resolve_labels`] turns them into line numbers.

use std::collections::HashMap;

use cpq_quad::{Opcode, Operand, Program as QuadProgram};
use cpq_syntax::ast::{
    BooleanExpression, CompareOp, DataType, Expression, Program, Statement, SwitchCase,
};
use cpq_syntax::error::CodegenError;

/// An evaluated subexpression: where its result lives, and its type.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub operand: Operand,
    pub data_type: DataType,
}

/// Float if any operand is Float, else Integer.
fn common_type(lhs: DataType, rhs: DataType) -> DataType {
    if lhs == DataType::Float || rhs == DataType::Float {
        DataType::Float
    } else {
        DataType::Integer
    }
}

/// Generate QUAD code for a whole program.
pub fn generate(program: &Program) -> (QuadProgram, Vec<CodegenError>) {
    let mut generator = Generator::new();
    generator.emit_program(program);
    generator.finish()
}

#[derive(Default)]
pub struct Generator {
    errors: Vec<CodegenError>,
    symbols: HashMap<String, DataType>,
    code: QuadProgram,
    temp_index: u32,
    label_index: u32,
    break_labels: Vec<u32>,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-declare a variable. Used by declaration processing and by
    /// tests that drive statement generation directly.
    pub fn define(&mut self, name: &str, data_type: DataType) {
        self.symbols.insert(name.to_owned(), data_type);
    }

    pub fn finish(self) -> (QuadProgram, Vec<CodegenError>) {
        (self.code, self.errors)
    }

    fn error(&mut self, message: String) {
        self.errors.push(CodegenError::new(message));
    }

    fn next_temp(&mut self) -> Operand {
        self.temp_index += 1;
        Operand::Temp(self.temp_index)
    }

    fn next_label(&mut self) -> u32 {
        self.label_index += 1;
        self.label_index
    }

    fn lookup(&mut self, name: &str) -> Option<DataType> {
        match self.symbols.get(name) {
            Some(&data_type) => Some(data_type),
            None => {
                self.error(format!("Undefined variable {name}."));
                None
            }
        }
    }

    /// Promote an integer value to float through a fresh temporary.
    fn widen(&mut self, value: Value) -> Value {
        if value.data_type == DataType::Float {
            return value;
        }
        let temp = self.next_temp();
        self.code
            .emit(Opcode::Itor, vec![temp.clone(), value.operand]);
        Value {
            operand: temp,
            data_type: DataType::Float,
        }
    }

    pub fn emit_program(&mut self, program: &Program) {
        for declaration in &program.declarations {
            for name in &declaration.names {
                if self.symbols.contains_key(name) {
                    self.error(format!("Variable {name} already defined."));
                } else {
                    self.symbols.insert(name.clone(), declaration.data_type);
                }
            }
        }
        for statement in &program.body {
            self.emit_statement(statement);
        }
    }

    pub fn emit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Assignment {
                variable,
                value,
                cast_type,
            } => self.emit_assignment(variable, value, *cast_type),
            Statement::Input { variable } => {
                if let Some(data_type) = self.lookup(variable) {
                    self.code.emit(
                        Opcode::input(data_type),
                        vec![Operand::Var(variable.clone())],
                    );
                }
            }
            Statement::Output { value } => {
                if let Some(value) = self.emit_expression(value) {
                    self.code
                        .emit(Opcode::print(value.data_type), vec![value.operand]);
                }
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => self.emit_if(condition, then_branch, else_branch),
            Statement::While { condition, body } => self.emit_while(condition, body),
            Statement::Switch {
                selector,
                cases,
                default_case,
            } => self.emit_switch(selector, cases, default_case),
            Statement::Break => match self.break_labels.last().copied() {
                Some(label) => {
                    self.code.emit(Opcode::Jump, vec![Operand::Label(label)]);
                }
                None => {
                    self.error(
                        "Break statement must be inside a while loop or a switch case."
                            .to_owned(),
                    );
                }
            },
            Statement::Block(statements) => {
                for statement in statements {
                    self.emit_statement(statement);
                }
            }
        }
    }

    fn emit_assignment(&mut self, variable: &str, value: &Expression, cast_type: DataType) {
        let target_type = self.lookup(variable);
        let value = self.emit_expression(value);
        let (Some(target_type), Some(mut value)) = (target_type, value) else {
            return;
        };

        // An explicit static_cast converts the evaluated value first;
        // casting to the type the value already has is a no-op.
        match cast_type {
            DataType::Integer if value.data_type == DataType::Float => {
                let temp = self.next_temp();
                self.code
                    .emit(Opcode::Rtoi, vec![temp.clone(), value.operand]);
                value = Value {
                    operand: temp,
                    data_type: DataType::Integer,
                };
            }
            DataType::Float if value.data_type == DataType::Integer => {
                value = self.widen(value);
            }
            _ => {}
        }

        match (value.data_type, target_type) {
            (DataType::Integer, DataType::Float) => {
                let value = self.widen(value);
                self.code.emit(
                    Opcode::Rasn,
                    vec![Operand::Var(variable.to_owned()), value.operand],
                );
            }
            (DataType::Float, DataType::Integer) => {
                self.error(format!(
                    "Cannot assign float value to int variable {variable}."
                ));
            }
            _ => {
                self.code.emit(
                    Opcode::assign(target_type),
                    vec![Operand::Var(variable.to_owned()), value.operand],
                );
            }
        }
    }

    fn emit_if(
        &mut self,
        condition: &BooleanExpression,
        then_branch: &Statement,
        else_branch: &Statement,
    ) {
        let Some(condition) = self.emit_boolean_expression(condition) else {
            return;
        };
        let end_label = self.next_label();
        let else_label = self.next_label();
        self.code.emit(
            Opcode::Jmpz,
            vec![Operand::Label(else_label), condition.operand],
        );
        self.emit_statement(then_branch);
        self.code.emit(Opcode::Jump, vec![Operand::Label(end_label)]);
        self.code.emit_label(else_label);
        self.emit_statement(else_branch);
        self.code.emit_label(end_label);
    }

    fn emit_while(&mut self, condition: &BooleanExpression, body: &Statement) {
        let start_label = self.next_label();
        let end_label = self.next_label();
        self.code.emit_label(start_label);
        let Some(condition) = self.emit_boolean_expression(condition) else {
            return;
        };
        self.code.emit(
            Opcode::Jmpz,
            vec![Operand::Label(end_label), condition.operand],
        );
        self.break_labels.push(end_label);
        self.emit_statement(body);
        self.break_labels.pop();
        self.code
            .emit(Opcode::Jump, vec![Operand::Label(start_label)]);
        self.code.emit_label(end_label);
    }

    /// The selector is evaluated once and copied into a temporary; each
    /// case tests against it and falls through unless the body breaks to
    /// the shared end label.
    fn emit_switch(
        &mut self,
        selector: &Expression,
        cases: &[SwitchCase],
        default_case: &[Statement],
    ) {
        let end_label = self.next_label();
        let Some(selector) = self.emit_expression(selector) else {
            return;
        };
        let selector_temp = self.next_temp();
        self.code.emit(
            Opcode::Iasn,
            vec![selector_temp.clone(), selector.operand],
        );

        self.break_labels.push(end_label);
        for case in cases {
            let next_label = self.next_label();
            let result = self.next_temp();
            self.code.emit(
                Opcode::Ieql,
                vec![
                    result.clone(),
                    selector_temp.clone(),
                    Operand::Int(case.value),
                ],
            );
            self.code
                .emit(Opcode::Jmpz, vec![Operand::Label(next_label), result]);
            for statement in &case.statements {
                self.emit_statement(statement);
            }
            self.code.emit_label(next_label);
        }
        for statement in default_case {
            self.emit_statement(statement);
        }
        self.break_labels.pop();
        self.code.emit_label(end_label);
    }

    pub fn emit_expression(&mut self, expression: &Expression) -> Option<Value> {
        match expression {
            Expression::IntLiteral(value) => Some(Value {
                operand: Operand::Int(*value),
                data_type: DataType::Integer,
            }),
            Expression::FloatLiteral(value) => Some(Value {
                operand: Operand::Float(*value),
                data_type: DataType::Float,
            }),
            Expression::Variable(name) => {
                let data_type = self.lookup(name)?;
                Some(Value {
                    operand: Operand::Var(name.clone()),
                    data_type,
                })
            }
            Expression::Arithmetic { op, lhs, rhs } => {
                let lhs = self.emit_expression(lhs);
                let rhs = self.emit_expression(rhs);
                let (lhs, rhs) = lhs.zip(rhs)?;
                let data_type = common_type(lhs.data_type, rhs.data_type);

                // The result temp is reserved before any widening temps.
                let result = self.next_temp();
                let (lhs, rhs) = if data_type == DataType::Float {
                    (self.widen(lhs), self.widen(rhs))
                } else {
                    (lhs, rhs)
                };
                self.code.emit(
                    Opcode::arith(*op, data_type),
                    vec![result.clone(), lhs.operand, rhs.operand],
                );
                Some(Value {
                    operand: result,
                    data_type,
                })
            }
        }
    }

    pub fn emit_boolean_expression(&mut self, expression: &BooleanExpression) -> Option<Value> {
        match expression {
            BooleanExpression::Compare { op, lhs, rhs } => {
                let lhs = self.emit_expression(lhs);
                let rhs = self.emit_expression(rhs);
                let (lhs, rhs) = lhs.zip(rhs)?;
                let data_type = common_type(lhs.data_type, rhs.data_type);
                let (lhs, rhs) = if data_type == DataType::Float {
                    (self.widen(lhs), self.widen(rhs))
                } else {
                    (lhs, rhs)
                };
                let value = match op {
                    CompareOp::EqualTo => self.emit_compare(Opcode::equal(data_type), lhs, rhs),
                    CompareOp::NotEqualTo => {
                        self.emit_compare(Opcode::not_equal(data_type), lhs, rhs)
                    }
                    CompareOp::LessThan => {
                        self.emit_compare(Opcode::less_than(data_type), lhs, rhs)
                    }
                    CompareOp::GreaterThan => {
                        self.emit_compare(Opcode::greater_than(data_type), lhs, rhs)
                    }
                    CompareOp::GreaterThanOrEqualTo => {
                        self.emit_compare_or_equal(Opcode::greater_than(data_type), data_type, lhs, rhs)
                    }
                    CompareOp::LessThanOrEqualTo => {
                        self.emit_compare_or_equal(Opcode::less_than(data_type), data_type, lhs, rhs)
                    }
                };
                Some(value)
            }
            BooleanExpression::And(lhs, rhs) => {
                let lhs = self.emit_boolean_expression(lhs);
                let rhs = self.emit_boolean_expression(rhs);
                let (lhs, rhs) = lhs.zip(rhs)?;
                let result = self.next_temp();
                self.code.emit(
                    Opcode::Imlt,
                    vec![result.clone(), lhs.operand, rhs.operand],
                );
                Some(Value {
                    operand: result,
                    data_type: DataType::Integer,
                })
            }
            BooleanExpression::Or(lhs, rhs) => {
                let lhs = self.emit_boolean_expression(lhs);
                let rhs = self.emit_boolean_expression(rhs);
                let (lhs, rhs) = lhs.zip(rhs)?;
                let result = self.next_temp();
                self.code.emit(
                    Opcode::Iadd,
                    vec![result.clone(), lhs.operand, rhs.operand],
                );
                // Normalize the sum back to 0/1 in place.
                self.code.emit(
                    Opcode::Igrt,
                    vec![result.clone(), result.clone(), Operand::Int(0)],
                );
                Some(Value {
                    operand: result,
                    data_type: DataType::Integer,
                })
            }
            BooleanExpression::Not(inner) => {
                let inner = self.emit_boolean_expression(inner)?;
                let result = self.next_temp();
                self.code.emit(
                    Opcode::Isub,
                    vec![result.clone(), Operand::Int(1), inner.operand],
                );
                Some(Value {
                    operand: result,
                    data_type: DataType::Integer,
                })
            }
        }
    }

    fn emit_compare(&mut self, opcode: Opcode, lhs: Value, rhs: Value) -> Value {
        let result = self.next_temp();
        self.code
            .emit(opcode, vec![result.clone(), lhs.operand, rhs.operand]);
        Value {
            operand: result,
            data_type: DataType::Integer,
        }
    }

    /// `>=` and `<=` have no direct opcode: combine equality with the
    /// strict comparison and normalize the sum to 0/1.
    fn emit_compare_or_equal(
        &mut self,
        strict: Opcode,
        data_type: DataType,
        lhs: Value,
        rhs: Value,
    ) -> Value {
        let equal = self.next_temp();
        self.code.emit(
            Opcode::equal(data_type),
            vec![equal.clone(), lhs.operand.clone(), rhs.operand.clone()],
        );
        let ordered = self.next_temp();
        self.code
            .emit(strict, vec![ordered.clone(), lhs.operand, rhs.operand]);
        let result = self.next_temp();
        self.code
            .emit(Opcode::Iadd, vec![result.clone(), equal, ordered]);
        self.code.emit(
            Opcode::Igrt,
            vec![result.clone(), result.clone(), Operand::Int(0)],
        );
        Value {
            operand: result,
            data_type: DataType::Integer,
        }
    }
}
