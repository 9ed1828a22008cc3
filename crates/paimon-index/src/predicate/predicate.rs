// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt::{Display, Formatter};

use crate::error::*;
use crate::predicate::{FieldRef, Literal};

/// Leaf comparison functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    StartsWith,
    EndsWith,
    Contains,
}

impl Function {
    /// The function answering the logically negated question, if one exists.
    pub fn negated(&self) -> Option<Function> {
        match self {
            Function::Equal => Some(Function::NotEqual),
            Function::NotEqual => Some(Function::Equal),
            Function::LessThan => Some(Function::GreaterOrEqual),
            Function::GreaterOrEqual => Some(Function::LessThan),
            Function::GreaterThan => Some(Function::LessOrEqual),
            Function::LessOrEqual => Some(Function::GreaterThan),
            Function::In => Some(Function::NotIn),
            Function::NotIn => Some(Function::In),
            Function::IsNull => Some(Function::IsNotNull),
            Function::IsNotNull => Some(Function::IsNull),
            Function::StartsWith | Function::EndsWith | Function::Contains => None,
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Function::Equal => "EQUAL",
            Function::NotEqual => "NOT_EQUAL",
            Function::LessThan => "LESS_THAN",
            Function::LessOrEqual => "LESS_OR_EQUAL",
            Function::GreaterThan => "GREATER_THAN",
            Function::GreaterOrEqual => "GREATER_OR_EQUAL",
            Function::In => "IN",
            Function::NotIn => "NOT_IN",
            Function::IsNull => "IS_NULL",
            Function::IsNotNull => "IS_NOT_NULL",
            Function::StartsWith => "STARTS_WITH",
            Function::EndsWith => "ENDS_WITH",
            Function::Contains => "CONTAINS",
        };
        write!(f, "{name}")
    }
}

/// A single-field comparison `(field, function, literals)`.
///
/// `IS_NULL`/`IS_NOT_NULL` carry no literals; `IN`/`NOT_IN` carry one or
/// more; all other functions exactly one. Literals are never null and their
/// type always equals the field type.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafPredicate {
    field: FieldRef,
    function: Function,
    literals: Vec<Literal>,
}

impl LeafPredicate {
    pub fn new(field: FieldRef, function: Function, literals: Vec<Literal>) -> Result<Self> {
        match function {
            Function::IsNull | Function::IsNotNull => {
                if !literals.is_empty() {
                    return InvalidSnafu {
                        message: format!("{function} predicate takes no literals"),
                    }
                    .fail();
                }
            }
            Function::In | Function::NotIn => {
                if literals.is_empty() {
                    return InvalidSnafu {
                        message: format!("{function} predicate takes at least one literal"),
                    }
                    .fail();
                }
            }
            _ => {
                if literals.len() != 1 {
                    return InvalidSnafu {
                        message: format!("{function} predicate takes exactly one literal"),
                    }
                    .fail();
                }
            }
        }
        for literal in &literals {
            if literal.is_null() {
                return InvalidSnafu {
                    message: format!(
                        "literal cannot be null in predicate, field name {}",
                        field.name()
                    ),
                }
                .fail();
            }
            if literal.field_type() != field.field_type() {
                return InvalidSnafu {
                    message: format!(
                        "field {} has field type {} in literal, mismatch field type {} in predicate",
                        field.name(),
                        literal.field_type(),
                        field.field_type()
                    ),
                }
                .fail();
            }
        }
        Ok(Self {
            field,
            function,
            literals,
        })
    }

    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    pub fn function(&self) -> Function {
        self.function
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// The single literal of a unary comparison.
    pub fn literal(&self) -> Result<&Literal> {
        match self.literals.as_slice() {
            [literal] => Ok(literal),
            _ => InvalidSnafu {
                message: format!(
                    "{} predicate on field {} does not carry exactly one literal",
                    self.function,
                    self.field.name()
                ),
            }
            .fail(),
        }
    }

    fn negated(&self) -> Option<LeafPredicate> {
        self.function.negated().map(|function| LeafPredicate {
            field: self.field.clone(),
            function,
            literals: self.literals.clone(),
        })
    }
}

/// A predicate tree over leaf comparisons. `NOT` is lowered at construction
/// by [`Predicate::negated`]; only `AND`/`OR` appear as inner nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Leaf(LeafPredicate),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn leaf(field: FieldRef, function: Function, literals: Vec<Literal>) -> Result<Predicate> {
        Ok(Predicate::Leaf(LeafPredicate::new(field, function, literals)?))
    }

    pub fn equal(field: FieldRef, literal: Literal) -> Result<Predicate> {
        Self::leaf(field, Function::Equal, vec![literal])
    }

    pub fn not_equal(field: FieldRef, literal: Literal) -> Result<Predicate> {
        Self::leaf(field, Function::NotEqual, vec![literal])
    }

    pub fn less_than(field: FieldRef, literal: Literal) -> Result<Predicate> {
        Self::leaf(field, Function::LessThan, vec![literal])
    }

    pub fn less_or_equal(field: FieldRef, literal: Literal) -> Result<Predicate> {
        Self::leaf(field, Function::LessOrEqual, vec![literal])
    }

    pub fn greater_than(field: FieldRef, literal: Literal) -> Result<Predicate> {
        Self::leaf(field, Function::GreaterThan, vec![literal])
    }

    pub fn greater_or_equal(field: FieldRef, literal: Literal) -> Result<Predicate> {
        Self::leaf(field, Function::GreaterOrEqual, vec![literal])
    }

    pub fn is_in(field: FieldRef, literals: Vec<Literal>) -> Result<Predicate> {
        Self::leaf(field, Function::In, literals)
    }

    pub fn is_not_in(field: FieldRef, literals: Vec<Literal>) -> Result<Predicate> {
        Self::leaf(field, Function::NotIn, literals)
    }

    pub fn is_null(field: FieldRef) -> Result<Predicate> {
        Self::leaf(field, Function::IsNull, vec![])
    }

    pub fn is_not_null(field: FieldRef) -> Result<Predicate> {
        Self::leaf(field, Function::IsNotNull, vec![])
    }

    pub fn and(children: Vec<Predicate>) -> Predicate {
        Predicate::And(children)
    }

    pub fn or(children: Vec<Predicate>) -> Predicate {
        Predicate::Or(children)
    }

    /// Lower a logical `NOT` over this tree: leaves flip to their negated
    /// function, `AND`/`OR` swap by De Morgan. `None` when any involved leaf
    /// has no negation (e.g. `STARTS_WITH`).
    pub fn negated(&self) -> Option<Predicate> {
        match self {
            Predicate::Leaf(leaf) => leaf.negated().map(Predicate::Leaf),
            Predicate::And(children) => children
                .iter()
                .map(|c| c.negated())
                .collect::<Option<Vec<_>>>()
                .map(Predicate::Or),
            Predicate::Or(children) => children
                .iter()
                .map(|c| c.negated())
                .collect::<Option<Vec<_>>>()
                .map(Predicate::And),
        }
    }
}
