use std::fmt::Display;

use backstage_provider::{Diagnostic, Severity};

/// Write a message to stderr.
///
/// In tests, messages are also recorded in a thread local [history::History].
fn print_message(v: impl Display) {
    #[cfg(test)]
    {
        let history = crate::utils::message::history::History::global();
        history.push_message(format!("{v}"));
    }

    eprintln!("{v}");
}

pub(crate) fn error(v: impl Display) {
    print_message(std::format_args!("❌ ERROR: {v}"));
}

pub(crate) fn created(v: impl Display) {
    print_message(std::format_args!("✨ {v}"));
}

/// double width character, add an additional space for alignment
pub(crate) fn deleted(v: impl Display) {
    print_message(std::format_args!("🗑️  {v}"));
}

/// double width character, add an additional space for alignment
pub(crate) fn warning(v: impl Display) {
    print_message(std::format_args!("⚠️  {v}"));
}

/// Print a diagnostic as an error or a warning depending on its severity.
pub(crate) fn diagnostic(diagnostic: &Diagnostic) {
    match diagnostic.severity {
        Severity::Error => error(diagnostic),
        Severity::Warning => warning(diagnostic),
    }
}

/// Messages printed by the current thread.
///
/// Being thread local, the history is not shared between tests running in
/// parallel. Messages printed from other threads, e.g. tasks on a multi
/// threaded runtime, are not recorded.
#[cfg(test)]
pub mod history {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    thread_local! {
        static THREAD_HISTORY: Rc<RefCell<VecDeque<String>>> = {
            Rc::new(RefCell::new(VecDeque::new()))
        };
    }

    pub(crate) struct History {
        messages: Rc<RefCell<VecDeque<String>>>,
    }

    impl History {
        pub(crate) fn global() -> History {
            let messages = THREAD_HISTORY.with(|h| h.clone());
            History { messages }
        }

        /// Snapshot of the messages, oldest first.
        pub(crate) fn messages(&self) -> VecDeque<String> {
            self.messages.borrow().clone()
        }

        pub(crate) fn push_message(&self, message: String) {
            self.messages.borrow_mut().push_back(message);
        }
    }

    #[cfg(test)]
    mod tests {
        use backstage_provider::Diagnostic;

        use super::*;
        use crate::utils::message::diagnostic;

        #[test]
        fn diagnostics_are_prefixed_by_severity() {
            diagnostic(&Diagnostic::warning("stale", "served from fallback"));
            diagnostic(&Diagnostic::error("broken", "no fallback"));

            assert_eq!(&History::global().messages(), &[
                "⚠️  stale: served from fallback",
                "❌ ERROR: broken: no fallback"
            ]);
        }
    }
}
