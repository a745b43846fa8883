//! Operator definitions, weights and typing rules.

use crate::expression::ReturnType;

/// Binary operators supported in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Arithmetic, concatenation for Character operands
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    // Relational
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `$`: left operand is a substring of the right
    Contains,

    // Logical
    And,
    Or,
}

impl BinaryOperator {
    /// Get the output type of this operator given operand types
    pub fn output_type(&self, left: ReturnType, right: ReturnType) -> Option<ReturnType> {
        use ReturnType::*;

        match self {
            BinaryOperator::Add => match (left, right) {
                (Character, Character) => Some(Character),
                (Numeric, Numeric) => Some(Numeric),
                (Date, Numeric) | (Numeric, Date) => Some(Date),
                _ => None,
            },

            BinaryOperator::Sub => match (left, right) {
                (Character, Character) => Some(Character),
                (Numeric, Numeric) => Some(Numeric),
                (Date, Numeric) => Some(Date),
                (Date, Date) => Some(Numeric),
                _ => None,
            },

            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod | BinaryOperator::Pow => {
                match (left, right) {
                    (Numeric, Numeric) => Some(Numeric),
                    _ => None,
                }
            }

            BinaryOperator::Eq
            | BinaryOperator::Ne
            | BinaryOperator::Lt
            | BinaryOperator::Le
            | BinaryOperator::Gt
            | BinaryOperator::Ge => {
                if left == right {
                    Some(Logical)
                } else {
                    None
                }
            }

            BinaryOperator::Contains => match (left, right) {
                (Character, Character) => Some(Logical),
                _ => None,
            },

            BinaryOperator::And | BinaryOperator::Or => match (left, right) {
                (Logical, Logical) => Some(Logical),
                _ => None,
            },
        }
    }

    /// Precedence weight; lower weights bind looser.
    pub fn weight(&self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Eq
            | BinaryOperator::Ne
            | BinaryOperator::Lt
            | BinaryOperator::Le
            | BinaryOperator::Gt
            | BinaryOperator::Ge
            | BinaryOperator::Contains => 4,
            BinaryOperator::Add | BinaryOperator::Sub => 6,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => 7,
            BinaryOperator::Pow => 8,
        }
    }

    pub fn is_relational(&self) -> bool {
        self.weight() == 4
    }

    /// Get the display string for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Pow => "^",
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Contains => "$",
            BinaryOperator::And => ".AND.",
            BinaryOperator::Or => ".OR.",
        }
    }
}

/// Unary operators supported in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Minus,
}

impl UnaryOperator {
    /// Get the output type of this operator given operand type
    pub fn output_type(&self, operand: ReturnType) -> Option<ReturnType> {
        match (self, operand) {
            (UnaryOperator::Not, ReturnType::Logical) => Some(ReturnType::Logical),
            (UnaryOperator::Minus, ReturnType::Numeric) => Some(ReturnType::Numeric),
            _ => None,
        }
    }

    pub fn weight(&self) -> u8 {
        match self {
            UnaryOperator::Not => 3,
            UnaryOperator::Minus => 9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Not => ".NOT.",
            UnaryOperator::Minus => "-",
        }
    }
}

/// Either operator form, as stored in an operator node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Binary(BinaryOperator),
    Unary(UnaryOperator),
}

impl Operator {
    pub fn weight(&self) -> u8 {
        match self {
            Operator::Binary(op) => op.weight(),
            Operator::Unary(op) => op.weight(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Binary(op) => op.as_str(),
            Operator::Unary(op) => op.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReturnType::*;

    #[test]
    fn test_binary_operator_output_types() {
        assert_eq!(BinaryOperator::Add.output_type(Numeric, Numeric), Some(Numeric));
        assert_eq!(
            BinaryOperator::Add.output_type(Character, Character),
            Some(Character)
        );
        assert_eq!(BinaryOperator::Add.output_type(Date, Numeric), Some(Date));
        assert_eq!(BinaryOperator::Add.output_type(Numeric, Date), Some(Date));
        assert_eq!(BinaryOperator::Add.output_type(Date, Date), None);
        assert_eq!(BinaryOperator::Add.output_type(Character, Numeric), None);

        assert_eq!(BinaryOperator::Sub.output_type(Date, Date), Some(Numeric));
        assert_eq!(BinaryOperator::Sub.output_type(Numeric, Date), None);

        assert_eq!(BinaryOperator::Mul.output_type(Numeric, Numeric), Some(Numeric));
        assert_eq!(BinaryOperator::Pow.output_type(Character, Numeric), None);

        assert_eq!(BinaryOperator::Eq.output_type(Date, Date), Some(Logical));
        assert_eq!(BinaryOperator::Lt.output_type(Numeric, Character), None);
        assert_eq!(
            BinaryOperator::Contains.output_type(Character, Character),
            Some(Logical)
        );
        assert_eq!(BinaryOperator::And.output_type(Logical, Numeric), None);
    }

    #[test]
    fn test_unary_operator_output_types() {
        assert_eq!(UnaryOperator::Not.output_type(Logical), Some(Logical));
        assert_eq!(UnaryOperator::Not.output_type(Numeric), None);
        assert_eq!(UnaryOperator::Minus.output_type(Numeric), Some(Numeric));
        assert_eq!(UnaryOperator::Minus.output_type(Date), None);
    }

    #[test]
    fn test_weights_order_precedence() {
        assert!(BinaryOperator::Or.weight() < BinaryOperator::And.weight());
        assert!(BinaryOperator::And.weight() < UnaryOperator::Not.weight());
        assert!(UnaryOperator::Not.weight() < BinaryOperator::Eq.weight());
        assert!(BinaryOperator::Eq.weight() < BinaryOperator::Add.weight());
        assert!(BinaryOperator::Add.weight() < BinaryOperator::Mul.weight());
        assert!(BinaryOperator::Mul.weight() < BinaryOperator::Pow.weight());
        assert!(BinaryOperator::Pow.weight() < UnaryOperator::Minus.weight());
        assert!(BinaryOperator::Contains.is_relational());
    }
}
