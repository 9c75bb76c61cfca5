pub mod approval;

pub use approval::{
    ApprovalDecision, ApprovalGate, ApprovalRequest, AutoDenyGate, CliApprovalGate,
    SlackApprovalGate, create_gate, summarize_params,
};
