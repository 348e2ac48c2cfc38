//! Sandboxed regular-expression execution.
//!
//! Guest regex operations never run on the engine's own stack in the default
//! mode: each request is shipped to a worker thread as plain owned data, the
//! engine parks itself, and either the worker's answer or the deadline wins.
//! A request that misses its deadline resumes the guest with `null` and a
//! guest `Error` naming the pattern.
//!
//! Offsets crossing this boundary are in characters (the engine's
//! string-index unit); the worker converts to and from byte offsets around
//! the `regex` crate.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use regex::{Regex, RegexBuilder};

/// How regex operations execute (observable configuration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegexpMode {
    /// Mode 0: every regex operation raises a guest Error.
    Reject,
    /// Mode 1: run on the engine thread, no watchdog.
    Native,
    /// Mode 2: worker thread with a deadline (the default).
    #[default]
    Sandboxed,
}

/// Flags of the regexp being executed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexFlags {
    pub global: bool,
    pub ignore_case: bool,
    pub multiline: bool,
}

/// One regex operation, fully owned so it can cross the thread boundary.
#[derive(Debug, Clone)]
pub struct RegexRequest {
    pub pattern: String,
    pub flags: RegexFlags,
    pub subject: String,
    pub op: RegexOp,
}

#[derive(Debug, Clone)]
pub enum RegexOp {
    /// `RegExp.prototype.exec`: one match starting at `last_index`.
    Exec { last_index: usize },
    /// `String.prototype.match`.
    Match,
    /// `String.prototype.search`.
    Search,
    /// `String.prototype.split`.
    Split { limit: Option<u32> },
    /// `String.prototype.replace` with a string replacement.
    Replace { replacement: String },
}

/// One match: character index plus capture texts (`captures[0]` is the full
/// match; `None` marks a group that did not participate).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchData {
    pub index: usize,
    pub captures: Vec<Option<String>>,
}

/// Worker answer.
#[derive(Debug, Clone)]
pub enum RegexOutcome {
    Exec {
        found: Option<MatchData>,
        last_index: usize,
    },
    Match(Option<Vec<MatchData>>),
    Search(Option<usize>),
    Split(Vec<Option<String>>),
    Replace(String),
    /// The pattern was rejected at compile time.
    BadPattern(String),
}

/// A request in flight on a worker thread.
pub struct RegexJob {
    receiver: mpsc::Receiver<RegexOutcome>,
    deadline: Instant,
    pattern: String,
}

/// What polling a job produced.
pub enum JobPoll {
    Pending,
    Ready(RegexOutcome),
    /// Deadline passed; `String` is the pattern source for the error
    /// message.
    TimedOut(String),
}

impl RegexJob {
    /// Ship `request` to a fresh worker thread.
    pub fn spawn(request: RegexRequest, timeout: Duration) -> RegexJob {
        let pattern = request.pattern.clone();
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            // The receiver may be gone if the engine was dropped; nothing
            // to do about it then.
            let _ = sender.send(execute(request));
        });
        RegexJob {
            receiver,
            deadline: Instant::now() + timeout,
            pattern,
        }
    }

    /// Non-blocking poll, used by `step()`.
    pub fn poll(&self) -> JobPoll {
        match self.receiver.try_recv() {
            Ok(outcome) => JobPoll::Ready(outcome),
            Err(mpsc::TryRecvError::Empty) if Instant::now() < self.deadline => JobPoll::Pending,
            Err(mpsc::TryRecvError::Empty) => JobPoll::TimedOut(self.pattern.clone()),
            // A panicking worker counts as a timeout: the guest sees the
            // same null-plus-Error contract.
            Err(mpsc::TryRecvError::Disconnected) => JobPoll::TimedOut(self.pattern.clone()),
        }
    }

    /// Blocking wait until the answer or the deadline, used by `run()`.
    pub fn wait(&self) -> JobPoll {
        let now = Instant::now();
        if now >= self.deadline {
            return self.poll();
        }
        match self.receiver.recv_timeout(self.deadline - now) {
            Ok(outcome) => JobPoll::Ready(outcome),
            Err(_) => JobPoll::TimedOut(self.pattern.clone()),
        }
    }
}

/// Run a request inline (mode 1).
pub fn execute(request: RegexRequest) -> RegexOutcome {
    let compiled = match compile(&request.pattern, request.flags) {
        Ok(re) => re,
        Err(message) => return RegexOutcome::BadPattern(message),
    };
    let subject = request.subject.as_str();
    match request.op {
        RegexOp::Exec { last_index } => {
            let start = if request.flags.global { last_index } else { 0 };
            match find_at(&compiled, subject, start) {
                Some((data, end_char)) => RegexOutcome::Exec {
                    found: Some(data),
                    last_index: end_char,
                },
                None => RegexOutcome::Exec {
                    found: None,
                    last_index: 0,
                },
            }
        }
        RegexOp::Match => {
            if !request.flags.global {
                return RegexOutcome::Match(find_at(&compiled, subject, 0).map(|(m, _)| vec![m]));
            }
            let matches = find_all(&compiled, subject);
            if matches.is_empty() {
                RegexOutcome::Match(None)
            } else {
                RegexOutcome::Match(Some(matches))
            }
        }
        RegexOp::Search => RegexOutcome::Search(find_at(&compiled, subject, 0).map(|(m, _)| m.index)),
        RegexOp::Split { limit } => RegexOutcome::Split(split(&compiled, subject, limit)),
        RegexOp::Replace { replacement } => RegexOutcome::Replace(replace(
            &compiled,
            subject,
            &replacement,
            request.flags.global,
        )),
    }
}

fn compile(pattern: &str, flags: RegexFlags) -> Result<Regex, String> {
    RegexBuilder::new(pattern)
        .case_insensitive(flags.ignore_case)
        .multi_line(flags.multiline)
        .build()
        .map_err(|e| format!("unsupported regular expression /{pattern}/: {e}"))
}

/// First match at or after character offset `start`. Returns the match and
/// the character offset just past it.
fn find_at(re: &Regex, subject: &str, start: usize) -> Option<(MatchData, usize)> {
    let byte_start = char_to_byte(subject, start)?;
    let caps = re.captures_at(subject, byte_start)?;
    let full = caps.get(0).expect("group 0 always participates");
    let captures = caps
        .iter()
        .map(|g| g.map(|m| m.as_str().to_string()))
        .collect();
    let data = MatchData {
        index: byte_to_char(subject, full.start()),
        captures,
    };
    let end_char = byte_to_char(subject, full.end());
    Some((data, end_char))
}

/// All matches, advancing one character past zero-width matches so iteration
/// always terminates.
fn find_all(re: &Regex, subject: &str) -> Vec<MatchData> {
    let mut matches = Vec::new();
    let mut pos = 0;
    while pos <= subject.len() {
        let Some(caps) = re.captures_at(subject, pos) else {
            break;
        };
        let full = caps.get(0).expect("group 0 always participates");
        matches.push(MatchData {
            index: byte_to_char(subject, full.start()),
            captures: caps
                .iter()
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect(),
        });
        pos = if full.end() == full.start() {
            next_char_boundary(subject, full.end())
        } else {
            full.end()
        };
    }
    matches
}

/// Split including capture groups, per the language's split semantics.
fn split(re: &Regex, subject: &str, limit: Option<u32>) -> Vec<Option<String>> {
    let limit = limit.map(|l| l as usize).unwrap_or(usize::MAX);
    let mut parts: Vec<Option<String>> = Vec::new();
    if limit == 0 {
        return parts;
    }
    if subject.is_empty() {
        // An empty subject yields [""] unless the pattern matches empty.
        if re.find("").is_none() {
            parts.push(Some(String::new()));
        }
        return parts;
    }
    let mut last_end = 0;
    let mut pos = 0;
    while pos < subject.len() {
        let Some(caps) = re.captures_at(subject, pos) else {
            break;
        };
        let full = caps.get(0).expect("group 0 always participates");
        if full.start() >= subject.len() {
            break;
        }
        // A zero-width match at the previous split point produces no piece.
        if full.end() == last_end && full.start() == full.end() {
            pos = next_char_boundary(subject, pos);
            continue;
        }
        parts.push(Some(subject[last_end..full.start()].to_string()));
        if parts.len() >= limit {
            return parts;
        }
        for group in caps.iter().skip(1) {
            parts.push(group.map(|m| m.as_str().to_string()));
            if parts.len() >= limit {
                return parts;
            }
        }
        last_end = full.end();
        pos = if full.end() == full.start() {
            next_char_boundary(subject, full.end())
        } else {
            full.end()
        };
    }
    parts.push(Some(subject[last_end..].to_string()));
    parts
}

/// String-form replace with `$&`/`$n`/`` $` ``/`$'` expansion.
fn replace(re: &Regex, subject: &str, replacement: &str, global: bool) -> String {
    let mut result = String::new();
    let mut last_end = 0;
    let mut pos = 0;
    loop {
        let Some(caps) = re.captures_at(subject, pos) else {
            break;
        };
        let full = caps.get(0).expect("group 0 always participates");
        result.push_str(&subject[last_end..full.start()]);
        expand_replacement(&mut result, replacement, subject, &caps);
        last_end = full.end();
        if !global {
            break;
        }
        pos = if full.end() == full.start() {
            next_char_boundary(subject, full.end())
        } else {
            full.end()
        };
        if pos > subject.len() {
            break;
        }
    }
    result.push_str(&subject[last_end..]);
    result
}

/// Expand `$` patterns in a replacement string.
fn expand_replacement(out: &mut String, replacement: &str, subject: &str, caps: &regex::Captures) {
    let full = caps.get(0).expect("group 0 always participates");
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('&') => {
                chars.next();
                out.push_str(full.as_str());
            }
            Some('`') => {
                chars.next();
                out.push_str(&subject[..full.start()]);
            }
            Some('\'') => {
                chars.next();
                out.push_str(&subject[full.end()..]);
            }
            Some(d) if d.is_ascii_digit() => {
                chars.next();
                let mut group = d.to_digit(10).unwrap() as usize;
                // Two-digit group references when the group exists.
                if let Some(d2) = chars.peek().copied().filter(|c| c.is_ascii_digit()) {
                    let wide = group * 10 + d2.to_digit(10).unwrap() as usize;
                    if wide < caps.len() {
                        chars.next();
                        group = wide;
                    }
                }
                if group > 0 && group < caps.len() {
                    if let Some(m) = caps.get(group) {
                        out.push_str(m.as_str());
                    }
                } else {
                    out.push('$');
                    out.push(d);
                }
            }
            _ => out.push('$'),
        }
    }
}

// ============================================================================
// Offset conversions
// ============================================================================

fn char_to_byte(subject: &str, char_index: usize) -> Option<usize> {
    if char_index == 0 {
        return Some(0);
    }
    let mut count = 0;
    for (byte, _) in subject.char_indices() {
        if count == char_index {
            return Some(byte);
        }
        count += 1;
    }
    if count == char_index {
        Some(subject.len())
    } else {
        None
    }
}

fn byte_to_char(subject: &str, byte_index: usize) -> usize {
    subject[..byte_index].chars().count()
}

fn next_char_boundary(subject: &str, byte_index: usize) -> usize {
    let mut next = byte_index + 1;
    while next < subject.len() && !subject.is_char_boundary(next) {
        next += 1;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(pattern: &str, flags: RegexFlags, subject: &str, op: RegexOp) -> RegexRequest {
        RegexRequest {
            pattern: pattern.to_string(),
            flags,
            subject: subject.to_string(),
            op,
        }
    }

    #[test]
    fn test_exec_with_captures() {
        let outcome = execute(request(
            "(a+)(b)?",
            RegexFlags::default(),
            "xxaaab",
            RegexOp::Exec { last_index: 0 },
        ));
        let RegexOutcome::Exec { found: Some(m), .. } = outcome else {
            panic!("expected a match");
        };
        assert_eq!(m.index, 2);
        assert_eq!(
            m.captures,
            vec![
                Some("aaab".to_string()),
                Some("aaa".to_string()),
                Some("b".to_string())
            ]
        );
    }

    #[test]
    fn test_exec_respects_last_index() {
        let flags = RegexFlags {
            global: true,
            ..Default::default()
        };
        let outcome = execute(request("a", flags, "aaa", RegexOp::Exec { last_index: 2 }));
        let RegexOutcome::Exec {
            found: Some(m),
            last_index,
        } = outcome
        else {
            panic!("expected a match");
        };
        assert_eq!(m.index, 2);
        assert_eq!(last_index, 3);
    }

    #[test]
    fn test_split_with_captures() {
        let outcome = execute(request(
            "(,)",
            RegexFlags::default(),
            "a,b,c",
            RegexOp::Split { limit: None },
        ));
        let RegexOutcome::Split(parts) = outcome else {
            panic!();
        };
        assert_eq!(
            parts,
            vec![
                Some("a".to_string()),
                Some(",".to_string()),
                Some("b".to_string()),
                Some(",".to_string()),
                Some("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_replace_dollar_expansion() {
        let outcome = execute(request(
            "(\\w+) (\\w+)",
            RegexFlags::default(),
            "john smith",
            RegexOp::Replace {
                replacement: "$2, $1".to_string(),
            },
        ));
        let RegexOutcome::Replace(s) = outcome else {
            panic!();
        };
        assert_eq!(s, "smith, john");
    }

    #[test]
    fn test_global_replace() {
        let flags = RegexFlags {
            global: true,
            ..Default::default()
        };
        let outcome = execute(request(
            "a",
            flags,
            "banana",
            RegexOp::Replace {
                replacement: "o".to_string(),
            },
        ));
        let RegexOutcome::Replace(s) = outcome else {
            panic!();
        };
        assert_eq!(s, "bonono");
    }

    #[test]
    fn test_bad_pattern_reported() {
        let outcome = execute(request(
            "(a",
            RegexFlags::default(),
            "x",
            RegexOp::Search,
        ));
        assert!(matches!(outcome, RegexOutcome::BadPattern(_)));
    }

    #[test]
    fn test_expired_deadline_reports_timeout_with_pattern() {
        // A job whose deadline already passed and whose worker never
        // answered: polling and waiting must both surface the timeout,
        // carrying the pattern for the error message.
        let (_sender, receiver) = mpsc::channel();
        let job = RegexJob {
            receiver,
            deadline: Instant::now(),
            pattern: "(a+)+b".to_string(),
        };
        match job.poll() {
            JobPoll::TimedOut(pattern) => assert_eq!(pattern, "(a+)+b"),
            _ => panic!("expected a timeout"),
        }
        match job.wait() {
            JobPoll::TimedOut(pattern) => assert_eq!(pattern, "(a+)+b"),
            _ => panic!("expected a timeout"),
        }
    }

    #[test]
    fn test_dead_worker_counts_as_timeout() {
        let (sender, receiver) = mpsc::channel::<RegexOutcome>();
        drop(sender);
        let job = RegexJob {
            receiver,
            deadline: Instant::now() + Duration::from_secs(60),
            pattern: "x".to_string(),
        };
        assert!(matches!(job.poll(), JobPoll::TimedOut(_)));
    }

    #[test]
    fn test_job_roundtrip() {
        let job = RegexJob::spawn(
            request("b+", RegexFlags::default(), "aabbb", RegexOp::Search),
            Duration::from_secs(5),
        );
        match job.wait() {
            JobPoll::Ready(RegexOutcome::Search(Some(2))) => {}
            other => panic!("unexpected poll result: {:?}", discriminant_name(&other)),
        }
    }

    fn discriminant_name(poll: &JobPoll) -> &'static str {
        match poll {
            JobPoll::Pending => "Pending",
            JobPoll::Ready(_) => "Ready",
            JobPoll::TimedOut(_) => "TimedOut",
        }
    }
}
