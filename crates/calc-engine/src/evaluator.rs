//! Operation evaluator.
//!
//! Pure arithmetic over one request. Division by zero is the only domain
//! error and surfaces as `BadRequest`; nothing here can produce a 5xx.

use tracing::debug;

use calc_core::{CalcRequest, CalcResult, Operation, Outcome};

pub const DIVIDE_BY_ZERO: &str = "you tried to divide by zero";

/// Apply `operation` to the request's operands.
pub fn evaluate(request: &CalcRequest, operation: Operation) -> Outcome {
    let CalcRequest { a, b } = *request;
    let result = match operation {
        Operation::Add => a + b,
        Operation::Sub => a - b,
        Operation::Mul => a * b,
        Operation::Div => {
            if b == 0.0 {
                debug!(a, "division by zero rejected");
                return Outcome::bad_request(DIVIDE_BY_ZERO);
            }
            a / b
        }
    };
    Outcome::Success(CalcResult::new(result))
}

/// Evaluate by selector name (`sum`, `+`, ...). An unknown selector is a
/// `BadRequest` with message "invalid operation selected".
pub fn evaluate_selector(request: &CalcRequest, selector: &str) -> Outcome {
    match selector.parse::<Operation>() {
        Ok(operation) => evaluate(request, operation),
        Err(e) => Outcome::bad_request(e.to_string()),
    }
}
