/// Function call events read from the upstream stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionCallEvent;

impl FunctionCallEvent {
    /// Arguments for one function call are complete.
    pub const ARGUMENTS_DONE: &'static str = "response.function_call_arguments.done";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_done_wire_name() {
        assert_eq!(
            FunctionCallEvent::ARGUMENTS_DONE,
            "response.function_call_arguments.done"
        );
    }
}
