//! Lexical action classifier for proxy prompts (spec.md §4.5 "Proxy flow"
//! step 2: "an action chosen by a classifier over the prompt text").
//!
//! Mirrors `qore_policy::risk::classify_path`'s keyword-bucket shape: match
//! the lowercased prompt against an ordered list of action-bearing verbs,
//! most dangerous first.

use qore_types::Action;

pub fn classify_prompt(prompt: &str) -> Action {
    let lower = prompt.to_lowercase();
    if ["execute", "run ", "rm ", "delete", "shell", "subprocess"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        Action::Execute
    } else if ["write", "save", "create file", "modify", "update file"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        Action::Write
    } else if ["curl ", "http request", "fetch url", "call api", "webhook"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        Action::Network
    } else if ["sudo", "admin", "grant access", "change permission"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        Action::Admin
    } else {
        Action::Read
    }
}
