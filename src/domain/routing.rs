/// Number of digits in an ABA routing number.
pub const ROUTING_NUMBER_LEN: usize = 9;

/// Per-position weights of the ABA check digit formula.
const WEIGHTS: [u32; ROUTING_NUMBER_LEN] = [3, 7, 1, 3, 7, 1, 3, 7, 1];

/// Validate a 9-digit ABA routing number.
///
/// The weighted digit sum `3*(d0+d3+d6) + 7*(d1+d4+d7) + (d2+d5+d8)` must be a
/// multiple of 10. Any input that is not exactly nine ASCII digits is invalid;
/// there is no error path, `false` is the only signal.
pub fn is_valid_routing_number(routing_number: &str) -> bool {
    let bytes = routing_number.as_bytes();
    if bytes.len() != ROUTING_NUMBER_LEN {
        return false;
    }

    let mut sum = 0;
    for (byte, weight) in bytes.iter().zip(WEIGHTS) {
        if !byte.is_ascii_digit() {
            return false;
        }
        sum += u32::from(byte - b'0') * weight;
    }

    sum % 10 == 0
}
