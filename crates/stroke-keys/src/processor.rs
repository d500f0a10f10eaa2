//! Key processor: queue → pending buffer → match → dispatch.
//!
//! The processor owns a FIFO of decoded key presses and resolves them
//! against the binding registry. Per tick it pulls one press into the
//! pending buffer and arbitrates:
//!
//! 1. an eager exact match dispatches immediately,
//! 2. otherwise a live prefix match waits for more keys,
//! 3. otherwise an exact match dispatches ("last match wins"),
//! 4. otherwise the buffer flushes one press at a time, retrying each as a
//!    single-key match and discarding presses nothing wants.
//!
//! Design invariants:
//! * `feed` may be called from any thread; `process_keys` runs on the event
//!   loop thread only.
//! * Handler failures are logged and swallowed; the numeric argument and
//!   pending buffer are cleared and the processor moves on. Filter and
//!   `save_before` panics propagate (programmer error).
//! * A handler returning `NotImplemented` passes the press to the next
//!   candidate in specificity order.

use crate::keys::{Key, KeyOrChar, KeyPress};
use crate::registry::{Binding, KeyBindingsBase};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use stroke_buffer::Buffer;
use stroke_core::HandlerOutcome;
use tracing::{debug, error, trace};

/// Numeric-argument magnitude bound; accumulation clamps here.
pub const MAX_ARG: i64 = 1_000_000;

// -------------------------------------------------------------------------------------------------
// Event passed to handlers
// -------------------------------------------------------------------------------------------------

pub struct KeyPressEvent<'a> {
    pub key_sequence: &'a [KeyPress],
    pub previous_key_sequence: &'a [KeyPress],
    /// True when the same binding also handled the previous dispatch.
    pub is_repeat: bool,
    arg: Option<String>,
    pub buffer: &'a mut Buffer,
}

impl<'a> KeyPressEvent<'a> {
    /// Numeric argument: 1 when absent, −1 for a lone `-`, otherwise the
    /// accumulated (already clamped) value.
    pub fn arg(&self) -> i64 {
        match self.arg.as_deref() {
            None => 1,
            Some("-") => -1,
            Some(text) => text.parse::<i64>().unwrap_or(1).clamp(-MAX_ARG, MAX_ARG),
        }
    }

    pub fn arg_present(&self) -> bool {
        self.arg.is_some()
    }

    /// Raw data of the press that completed the sequence (the payload for
    /// self-insert and mouse handlers).
    pub fn data(&self) -> &str {
        self.key_sequence
            .last()
            .map(|kp| kp.data.as_str())
            .unwrap_or("")
    }
}

// -------------------------------------------------------------------------------------------------
// Hooks
// -------------------------------------------------------------------------------------------------

/// Observers around dispatch. Implementations must not block.
pub trait ProcessorHooks: Send + Sync {
    fn before_key_press(&self, _key_sequence: &[KeyPress]) {}
    fn after_key_press(&self, _key_sequence: &[KeyPress]) {}
}

// -------------------------------------------------------------------------------------------------
// Processor
// -------------------------------------------------------------------------------------------------

pub struct KeyProcessor {
    bindings: Arc<dyn KeyBindingsBase>,
    buffer: Arc<Mutex<Buffer>>,
    input_queue: Mutex<VecDeque<KeyPress>>,
    /// Presses forming a live prefix, not yet dispatched.
    key_buffer: Vec<KeyPress>,
    previous_key_sequence: Vec<KeyPress>,
    previous_binding: Option<Arc<Binding>>,
    arg: Option<String>,
    hooks: Vec<Arc<dyn ProcessorHooks>>,
    recording: Option<Vec<KeyPress>>,
}

impl KeyProcessor {
    pub fn new(bindings: Arc<dyn KeyBindingsBase>, buffer: Arc<Mutex<Buffer>>) -> Self {
        Self {
            bindings,
            buffer,
            input_queue: Mutex::new(VecDeque::new()),
            key_buffer: Vec::new(),
            previous_key_sequence: Vec::new(),
            previous_binding: None,
            arg: None,
            hooks: Vec::new(),
            recording: None,
        }
    }

    pub fn add_hooks(&mut self, hooks: Arc<dyn ProcessorHooks>) {
        self.hooks.push(hooks);
    }

    pub fn buffer(&self) -> Arc<Mutex<Buffer>> {
        self.buffer.clone()
    }

    // ---------------------------------------------------------------------------------------------
    // Queue management (any thread)
    // ---------------------------------------------------------------------------------------------

    pub fn feed(&self, key_press: KeyPress) {
        self.input_queue.lock().unwrap().push_back(key_press);
    }

    pub fn feed_front(&self, key_press: KeyPress) {
        self.input_queue.lock().unwrap().push_front(key_press);
    }

    /// Feed several presses at once (macro replay); `front` prepends them
    /// while keeping their relative order.
    pub fn feed_multiple(&self, key_presses: Vec<KeyPress>, front: bool) {
        let mut queue = self.input_queue.lock().unwrap();
        if front {
            for kp in key_presses.into_iter().rev() {
                queue.push_front(kp);
            }
        } else {
            queue.extend(key_presses);
        }
    }

    /// Drain the pending buffer and input queue as one list, dropping CPR
    /// responses (consumed by a separate subsystem).
    pub fn empty_queue(&mut self) -> Vec<KeyPress> {
        let mut drained: Vec<KeyPress> = std::mem::take(&mut self.key_buffer);
        drained.extend(self.input_queue.lock().unwrap().drain(..));
        drained
            .into_iter()
            .filter(|kp| kp.key != KeyOrChar::Key(Key::CPRResponse))
            .collect()
    }

    /// Clear queue, pending buffer, and numeric argument.
    pub fn reset(&mut self) {
        self.input_queue.lock().unwrap().clear();
        self.key_buffer.clear();
        self.arg = None;
    }

    pub fn key_buffer(&self) -> &[KeyPress] {
        &self.key_buffer
    }

    // ---------------------------------------------------------------------------------------------
    // Numeric argument
    // ---------------------------------------------------------------------------------------------

    /// Append a digit (or a leading `-`) to the numeric argument. Values
    /// clamp to ±1,000,000 with overflow snapping to the boundary.
    pub fn append_to_arg_count(&mut self, data: &str) {
        debug_assert!(
            data == "-" || data.chars().all(|c| c.is_ascii_digit()),
            "arg data must be digits or a leading minus"
        );
        let next = match (self.arg.as_deref(), data) {
            (None, "-") => "-".to_string(),
            (None, digit) => digit.to_string(),
            (Some(current), digit) => {
                let combined = format!("{current}{digit}");
                match combined.parse::<i64>() {
                    Ok(value) => value.clamp(-MAX_ARG, MAX_ARG).to_string(),
                    // Too long to parse: the clamp boundary in the current sign.
                    Err(_) => {
                        if combined.starts_with('-') {
                            (-MAX_ARG).to_string()
                        } else {
                            MAX_ARG.to_string()
                        }
                    }
                }
            }
        };
        debug!(target: "keys.processor", arg = %next, "arg_count");
        self.arg = Some(next);
    }

    pub fn arg(&self) -> Option<&str> {
        self.arg.as_deref()
    }

    // ---------------------------------------------------------------------------------------------
    // Macros
    // ---------------------------------------------------------------------------------------------

    pub fn start_recording_macro(&mut self) {
        self.recording = Some(Vec::new());
    }

    pub fn stop_recording_macro(&mut self) -> Vec<KeyPress> {
        self.recording.take().unwrap_or_default()
    }

    pub fn is_recording_macro(&self) -> bool {
        self.recording.is_some()
    }

    /// Replay a recorded macro atomically: all presses enter the queue in
    /// one insertion, then process.
    pub fn replay_macro(&mut self, keys: Vec<KeyPress>, front: bool) {
        self.feed_multiple(keys, front);
        self.process_keys();
    }

    // ---------------------------------------------------------------------------------------------
    // SIGINT
    // ---------------------------------------------------------------------------------------------

    /// Synthesize a SIGINT press at the head of the queue and process it
    /// immediately.
    pub fn send_sigint(&mut self) {
        self.feed_front(KeyPress::new(Key::SIGINT));
        self.process_keys();
    }

    // ---------------------------------------------------------------------------------------------
    // Matching & dispatch (event-loop thread)
    // ---------------------------------------------------------------------------------------------

    /// Drain the input queue, arbitrating matches per the protocol above.
    pub fn process_keys(&mut self) {
        loop {
            let Some(press) = self.input_queue.lock().unwrap().pop_front() else {
                break;
            };
            self.key_buffer.push(press);
            let keys: Vec<KeyOrChar> = self.key_buffer.iter().map(|kp| kp.key).collect();

            let exact: Vec<Arc<Binding>> = self
                .bindings
                .get_bindings_for_keys(&keys)
                .into_iter()
                .filter(|b| b.filter.eval())
                .collect();
            let has_prefix = self
                .bindings
                .get_bindings_starting_with_keys(&keys)
                .iter()
                .any(|b| b.filter.eval());
            let eager: Vec<Arc<Binding>> = exact
                .iter()
                .filter(|b| b.eager.eval())
                .cloned()
                .collect();

            trace!(
                target: "keys.processor",
                buffered = self.key_buffer.len(),
                exact = exact.len(),
                prefix = has_prefix,
                eager = eager.len(),
                "match_step"
            );

            if !eager.is_empty() {
                let sequence = std::mem::take(&mut self.key_buffer);
                self.dispatch(&sequence, &eager);
            } else if has_prefix {
                // Longer binding still reachable; wait for more input.
                continue;
            } else if !exact.is_empty() {
                let sequence = std::mem::take(&mut self.key_buffer);
                self.dispatch(&sequence, &exact);
            } else {
                self.flush_key_buffer();
            }
        }
    }

    /// No binding can consume the pending buffer: retry each press alone,
    /// in order, discarding presses without a single-key match.
    fn flush_key_buffer(&mut self) {
        let pending = std::mem::take(&mut self.key_buffer);
        for press in pending {
            let single = [press.key];
            let matches: Vec<Arc<Binding>> = self
                .bindings
                .get_bindings_for_keys(&single)
                .into_iter()
                .filter(|b| b.filter.eval())
                .collect();
            if matches.is_empty() {
                trace!(target: "keys.processor", key = %press.key, "discard");
                continue;
            }
            self.dispatch(&[press], &matches);
        }
    }

    /// Dispatch a completed key sequence against its candidates: most
    /// specific (fewest wildcards) first, and within equal specificity the
    /// most recently registered. `NotImplemented` walks to the next
    /// candidate; an error clears transient state.
    fn dispatch(&mut self, key_sequence: &[KeyPress], candidates: &[Arc<Binding>]) {
        for hooks in &self.hooks {
            hooks.before_key_press(key_sequence);
        }

        // `candidates` arrives ordered (wildcards ascending, registration
        // ascending); reverse each specificity group so the latest
        // registration of the most specific class goes first.
        let wildcards =
            |b: &Arc<Binding>| b.keys().iter().filter(|k| k.is_any()).count();
        let mut ordered: Vec<Arc<Binding>> = Vec::with_capacity(candidates.len());
        let mut i = 0;
        while i < candidates.len() {
            let group = wildcards(&candidates[i]);
            let mut j = i;
            while j < candidates.len() && wildcards(&candidates[j]) == group {
                j += 1;
            }
            ordered.extend(candidates[i..j].iter().rev().cloned());
            i = j;
        }

        let arg = self.arg.take();
        let mut handled_by: Option<Arc<Binding>> = None;

        {
            let buffer = self.buffer.clone();
            let mut buffer = buffer.lock().unwrap();
            for binding in &ordered {
                let is_repeat = self
                    .previous_binding
                    .as_ref()
                    .is_some_and(|prev| Arc::ptr_eq(prev, binding));
                let mut event = KeyPressEvent {
                    key_sequence,
                    previous_key_sequence: &self.previous_key_sequence,
                    is_repeat,
                    arg: arg.clone(),
                    buffer: &mut buffer,
                };
                if (binding.save_before)(&event) {
                    event.buffer.save_to_undo_stack();
                }
                match binding.call(&mut event) {
                    Ok(HandlerOutcome::Handled) => {
                        handled_by = Some(binding.clone());
                        break;
                    }
                    Ok(HandlerOutcome::NotImplemented) => continue,
                    Err(err) => {
                        error!(target: "keys.processor", error = %err, "handler failed");
                        self.key_buffer.clear();
                        handled_by = Some(binding.clone());
                        break;
                    }
                }
            }
        }

        if let Some(binding) = handled_by {
            if let Some(recording) = self.recording.as_mut()
                && binding.record_in_macro.eval()
            {
                recording.extend_from_slice(key_sequence);
            }
            self.previous_key_sequence = key_sequence.to_vec();
            self.previous_binding = Some(binding);
        }

        for hooks in &self.hooks {
            hooks.after_key_press(key_sequence);
        }
    }
}
