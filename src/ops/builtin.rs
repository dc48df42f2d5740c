use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::types::Decimal;

use super::{Operation, OperationError};

/// The fixed built-in operation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`
    Divide,
    /// `a mod b`, sign follows the dividend.
    Modulus,
    /// `floor(a / b)`
    IntDivide,
    /// `a ^ b` through `f64`.
    Power,
    /// `a ^ (1 / b)` through `f64`.
    Root,
    /// `(a / b) * 100`
    Percent,
    /// `|a - b|`
    AbsDiff,
}

impl Builtin {
    /// Every built-in, in help-listing order.
    pub const ALL: [Builtin; 10] = [
        Builtin::Add,
        Builtin::Subtract,
        Builtin::Multiply,
        Builtin::Divide,
        Builtin::Power,
        Builtin::Root,
        Builtin::Modulus,
        Builtin::IntDivide,
        Builtin::Percent,
        Builtin::AbsDiff,
    ];

    /// Registry key for this operation.
    pub const fn name(self) -> &'static str {
        match self {
            Builtin::Add => "add",
            Builtin::Subtract => "subtract",
            Builtin::Multiply => "multiply",
            Builtin::Divide => "divide",
            Builtin::Modulus => "modulus",
            Builtin::IntDivide => "int_divide",
            Builtin::Power => "power",
            Builtin::Root => "root",
            Builtin::Percent => "percent",
            Builtin::AbsDiff => "abs_diff",
        }
    }
}

impl Operation for Builtin {
    fn validate(&self, a: Decimal, b: Decimal) -> Result<(), OperationError> {
        match self {
            Builtin::Divide | Builtin::Modulus | Builtin::IntDivide | Builtin::Percent => {
                if b.is_zero() {
                    return Err(OperationError::DivisionByZero);
                }
            }
            Builtin::Root => {
                if b.is_zero() {
                    return Err(OperationError::ZeroRoot);
                }
                if a.is_sign_negative() && !a.is_zero() && !is_odd_integer(b) {
                    return Err(OperationError::NegativeRoot);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn execute(&self, a: Decimal, b: Decimal) -> Result<Decimal, OperationError> {
        use OperationError::Overflow;

        let out = match self {
            Builtin::Add => a.checked_add(b).ok_or(Overflow)?,
            Builtin::Subtract => a.checked_sub(b).ok_or(Overflow)?,
            Builtin::Multiply => a.checked_mul(b).ok_or(Overflow)?,
            Builtin::Divide => a.checked_div(b).ok_or(Overflow)?,
            Builtin::Modulus => a.checked_rem(b).ok_or(Overflow)?,
            Builtin::IntDivide => floor_div(a, b)?,
            Builtin::Power => power(a, b)?,
            Builtin::Root => root(a, b)?,
            Builtin::Percent => a
                .checked_div(b)
                .and_then(|q| q.checked_mul(Decimal::ONE_HUNDRED))
                .ok_or(Overflow)?,
            Builtin::AbsDiff => a.checked_sub(b).ok_or(Overflow)?.abs(),
        };
        Ok(out.normalize())
    }
}

/// Exact floor division: the truncated quotient of `a - a % b` is integral,
/// adjusted down when the remainder and divisor differ in sign.
fn floor_div(a: Decimal, b: Decimal) -> Result<Decimal, OperationError> {
    let rem = a.checked_rem(b).ok_or(OperationError::Overflow)?;
    let quotient = a
        .checked_sub(rem)
        .and_then(|whole| whole.checked_div(b))
        .ok_or(OperationError::Overflow)?
        .round();
    if !rem.is_zero() && rem.is_sign_negative() != b.is_sign_negative() {
        quotient
            .checked_sub(Decimal::ONE)
            .ok_or(OperationError::Overflow)
    } else {
        Ok(quotient)
    }
}

fn power(a: Decimal, b: Decimal) -> Result<Decimal, OperationError> {
    let base = to_f64(a, OperationError::PowerInvalid)?;
    let exp = to_f64(b, OperationError::PowerInvalid)?;
    from_f64(base.powf(exp), OperationError::PowerInvalid)
}

fn root(a: Decimal, b: Decimal) -> Result<Decimal, OperationError> {
    let radicand = to_f64(a.abs(), OperationError::RootInvalid)?;
    let degree = to_f64(b, OperationError::RootInvalid)?;
    let magnitude = from_f64(radicand.powf(1.0 / degree), OperationError::RootInvalid)?;
    // validate() only lets negative radicands through for odd integer degrees
    if a.is_sign_negative() && !a.is_zero() {
        Ok(-magnitude)
    } else {
        Ok(magnitude)
    }
}

fn is_odd_integer(v: Decimal) -> bool {
    v.fract().is_zero() && !(v % Decimal::TWO).is_zero()
}

fn to_f64(v: Decimal, err: OperationError) -> Result<f64, OperationError> {
    v.to_f64().ok_or(err)
}

fn from_f64(v: f64, err: OperationError) -> Result<Decimal, OperationError> {
    if !v.is_finite() {
        return Err(err);
    }
    let out = Decimal::from_f64(v).ok_or_else(|| err.clone())?;
    // magnitudes below the smallest decimal step collapse to zero
    if out.is_zero() && v != 0.0 {
        return Err(err);
    }
    Ok(out)
}
