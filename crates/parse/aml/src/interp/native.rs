//! Control methods implemented by the interpreter.

use super::Interpreter;
use crate::AmlError;
use crate::host::Host;
use crate::namespace::NativeMethod;
use crate::object::AmlValue;

impl<H: Host> Interpreter<H> {
    /// Runs a native method with already evaluated arguments.
    pub(crate) fn call_native(
        &mut self,
        method: NativeMethod,
        args: &[AmlValue],
    ) -> Result<AmlValue, AmlError> {
        match method {
            NativeMethod::Osi => {
                let query = args.first().ok_or(AmlError::IllegalArguments)?.as_str()?;
                let supported = self.config.osi_strings.iter().any(|s| s == query);
                log::debug!(
                    "aml: _OSI(\"{query}\") = {}",
                    if supported { "supported" } else { "unsupported" }
                );
                Ok(AmlValue::Integer(if supported { self.width.ones() } else { 0 }))
            }
        }
    }
}
