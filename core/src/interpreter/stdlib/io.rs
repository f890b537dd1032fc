//! Output operations

use super::OpResult;
use crate::interpreter::errors::EngineError;
use crate::interpreter::registry::Output;
use crate::interpreter::types::Value;

fn render(args: &[Value]) -> Result<String, EngineError> {
    let mut text = String::new();
    for value in args {
        match value {
            Value::Null => {}
            Value::Str(_) | Value::Integer(_) | Value::Real(_) => text.push_str(&value.to_text()?),
            other => return Err(EngineError::type_mismatch("string", other)),
        }
    }
    Ok(text)
}

/// write(x1, ...) - print the arguments and a newline; produces the last argument
pub fn write(output: &Output, args: &[Value]) -> OpResult {
    let mut text = render(args)?;
    text.push('\n');
    output.write(&text)?;
    Ok(Some(args.last().cloned().unwrap_or(Value::Null)))
}

/// writes(x1, ...) - like write without the newline
pub fn writes(output: &Output, args: &[Value]) -> OpResult {
    output.write(&render(args)?)?;
    Ok(Some(args.last().cloned().unwrap_or(Value::Null)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_to_buffer() {
        let output = Output::buffer();
        write(&output, &["x = ".into(), 3.into()]).unwrap();
        writes(&output, &[Value::Null, "done".into()]).unwrap();
        assert_eq!(output.contents(), "x = 3\ndone");
    }

    #[test]
    fn test_write_rejects_structures() {
        let output = Output::buffer();
        assert!(write(&output, &[Value::list(vec![])]).is_err());
        assert_eq!(output.contents(), "");
    }
}
