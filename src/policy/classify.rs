// ABOUTME: Risk classification — static per-action levels plus dynamic command analysis.
// ABOUTME: Dangerous-command detection runs an ordered rule table with a Caution default.

use crate::request::ActionRequest;

use super::analysis::{CommandAnalysis, CommandSegment, analyze_command};
use super::types::RiskLevel;

/// Action name carrying a free-form shell command, classified dynamically.
pub const EXECUTE_COMMAND_ACTION: &str = "execute_command";

/// Assign a risk level to a request.
///
/// Most actions carry a static level fixed by their type; command execution
/// is classified by inspecting the command text itself.
pub fn classify(request: &ActionRequest) -> RiskLevel {
    match request.action_name.as_str() {
        "read_file" | "list_files" | "search_files" | "stat_file" => RiskLevel::Safe,
        "create_file" | "edit_file" | "edit_lines" | "append_file" => RiskLevel::Caution,
        "delete_file" => RiskLevel::Dangerous,
        EXECUTE_COMMAND_ACTION => {
            let command = request
                .argument("command")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            classify_command(command)
        }
        // Unknown actions get the conservative middle ground.
        _ => RiskLevel::Caution,
    }
}

/// One entry in the dangerous-command rule table.
struct CommandRule {
    /// Short name, used in tests and debugging.
    label: &'static str,
    risk: RiskLevel,
    applies: fn(&CommandAnalysis) -> bool,
}

/// Rules evaluated top to bottom; the first match wins. Most severe first,
/// so a command that is both escalated and destructive reports the worse level.
const COMMAND_RULES: &[CommandRule] = &[
    CommandRule {
        label: "recursive-root-delete",
        risk: RiskLevel::Blocked,
        applies: |a| a.segments.iter().any(is_recursive_root_delete),
    },
    CommandRule {
        label: "filesystem-overwrite",
        risk: RiskLevel::Blocked,
        applies: |a| a.segments.iter().any(is_filesystem_overwrite),
    },
    CommandRule {
        label: "fork-bomb",
        risk: RiskLevel::Blocked,
        applies: |a| {
            a.segments
                .iter()
                .any(|s| s.executable.starts_with(":(){") || s.executable == ":")
        },
    },
    CommandRule {
        label: "superuser-escalation",
        risk: RiskLevel::Dangerous,
        applies: |a| {
            a.segments
                .iter()
                .any(|s| matches!(s.bin_name(), "sudo" | "su" | "doas"))
        },
    },
    CommandRule {
        label: "recursive-delete",
        risk: RiskLevel::Dangerous,
        applies: |a| {
            a.segments
                .iter()
                .any(|s| s.bin_name() == "rm" && has_flag(s, 'r'))
        },
    },
    CommandRule {
        label: "pipe-to-shell",
        risk: RiskLevel::Dangerous,
        applies: is_pipe_to_shell,
    },
    CommandRule {
        label: "system-power",
        risk: RiskLevel::Dangerous,
        applies: |a| {
            a.segments
                .iter()
                .any(|s| matches!(s.bin_name(), "shutdown" | "reboot" | "halt" | "poweroff"))
        },
    },
    CommandRule {
        label: "recursive-chmod-chown",
        risk: RiskLevel::Dangerous,
        applies: |a| {
            a.segments.iter().any(|s| {
                matches!(s.bin_name(), "chmod" | "chown")
                    && has_flag(s, 'R')
                    && s.args.iter().any(|arg| arg == "/" || arg == "/*")
            })
        },
    },
];

/// Classify a free-form shell command.
///
/// Rule table first; if nothing matches, an all-safe-bin pipeline is Safe
/// and everything else defaults to Caution.
pub fn classify_command(command: &str) -> RiskLevel {
    let analysis = expand_escalations(analyze_command(command));

    for rule in COMMAND_RULES {
        if (rule.applies)(&analysis) {
            tracing::debug!(rule = rule.label, "command matched risk rule");
            return rule.risk;
        }
    }

    if analysis.all_safe_bins {
        RiskLevel::Safe
    } else {
        RiskLevel::Caution
    }
}

/// Append a synthetic segment for the command wrapped by sudo/doas, so the
/// wrapped command is judged by the same rules as a bare one.
fn expand_escalations(mut analysis: CommandAnalysis) -> CommandAnalysis {
    let mut inner = Vec::new();
    for segment in &analysis.segments {
        if !matches!(segment.bin_name(), "sudo" | "doas") {
            continue;
        }
        let mut args = segment.args.iter().skip_while(|a| a.starts_with('-'));
        if let Some(executable) = args.next() {
            inner.push(CommandSegment {
                executable: executable.clone(),
                args: args.cloned().collect(),
                piped_input: false,
            });
        }
    }
    analysis.segments.extend(inner);
    analysis
}

/// True when a combined short-flag cluster or long flag requests `flag`
/// (e.g. `-rf` contains 'r', `--recursive` matches 'r' and 'R').
fn has_flag(segment: &CommandSegment, flag: char) -> bool {
    let long = match flag.to_ascii_lowercase() {
        'r' => "--recursive",
        _ => "",
    };
    segment.args.iter().any(|arg| {
        (!long.is_empty() && arg == long)
            || (arg.starts_with('-') && !arg.starts_with("--") && arg.contains(flag))
    })
}

/// Unconditional recursive deletion rooted at `/` (or one level below it).
fn is_recursive_root_delete(segment: &CommandSegment) -> bool {
    if segment.bin_name() != "rm" || !has_flag(segment, 'r') {
        return false;
    }
    segment.args.iter().any(|arg| {
        if arg.starts_with('-') {
            return false;
        }
        let trimmed = arg.trim_end_matches('*').trim_end_matches('/');
        // "/" and "/usr" style targets; deeper paths are dangerous, not blocked.
        trimmed.is_empty() || (arg.starts_with('/') && trimmed.matches('/').count() <= 1)
    })
}

/// `mkfs.*` anywhere, or `dd` writing straight to a block device.
fn is_filesystem_overwrite(segment: &CommandSegment) -> bool {
    if segment.bin_name().starts_with("mkfs") {
        return true;
    }
    segment.bin_name() == "dd"
        && segment
            .args
            .iter()
            .any(|arg| arg.starts_with("of=/dev/"))
}

/// A download tool piped into a shell interpreter.
fn is_pipe_to_shell(analysis: &CommandAnalysis) -> bool {
    analysis.segments.windows(2).any(|pair| {
        let downloader = matches!(pair[0].bin_name(), "curl" | "wget" | "fetch");
        let shell = pair[1].piped_input
            && matches!(pair[1].bin_name(), "sh" | "bash" | "zsh" | "dash" | "fish");
        downloader && shell
    })
}
