/// User intents a host forwards to a running session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    Select(usize),
    Next,
    Previous,
    ToggleFlag,
    Submit,
    RequestExit,
    CancelExit,
    ConfirmExit,
}
