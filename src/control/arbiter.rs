//! Mode arbiter — decides the single automatic action of a control cycle.
//!
//! Arbitration is an ordered table of `(name, rule)` pairs evaluated
//! top-to-bottom; the first rule that does not pass wins.  A rule either
//! passes, holds the cycle (no automatic action may follow), or requests
//! one transit.  The arbiter is re-entrant and reads only the input
//! snapshot handed to it, so at most one [`PositionDriver`] invocation can
//! result per cycle.
//!
//! [`PositionDriver`]: super::position::PositionDriver

use log::debug;

use super::context::{Position, Target};
use super::occupancy::FireEvent;

/// Why an action was requested — drives the alert level downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionReason {
    /// Rain while extended; highest priority.
    EmergencyRain,
    /// Debounced presence flip under occupancy control.
    Occupancy,
    /// Favourable drying conditions while retracted.
    AutoExtend,
    /// Conditions no longer favourable while extended.
    AutoRetract,
}

/// One requested transit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub target: Target,
    pub reason: ActionReason,
}

/// Outcome of one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// Rule does not apply; try the next one.
    Pass,
    /// Rule applies and forbids any automatic action this cycle.
    Hold,
    /// Rule applies and requests a transit.
    Act(Action),
}

/// Everything a rule is allowed to look at.  Built fresh each cycle from
/// the control context and this cycle's debouncer output.
#[derive(Debug, Clone, Copy)]
pub struct ArbiterInput {
    pub position: Position,
    pub auto_enabled: bool,
    pub manual_command_in_progress: bool,
    /// Condition evaluator output for this cycle.
    pub good_conditions: bool,
    pub rain: bool,
    pub occupancy_enabled: bool,
    /// Privacy policy (retract when present) vs. access policy.
    pub retract_on_present: bool,
    /// Debounced presence level.
    pub present: bool,
    /// Presence flip fired by the debouncer this cycle, if any.
    pub fire: Option<FireEvent>,
}

type Rule = fn(&ArbiterInput) -> Verdict;

/// Priority order.  First non-`Pass` verdict wins.
const RULES: &[(&str, Rule)] = &[
    ("emergency_override", emergency_override),
    ("manual_hold", manual_hold),
    ("occupancy_action", occupancy_action),
    ("auto_extend", auto_extend),
    ("auto_retract", auto_retract),
];

/// Run the rule table.  `None` means no automatic action this cycle.
pub fn decide(input: &ArbiterInput) -> Option<Action> {
    for (name, rule) in RULES {
        match rule(input) {
            Verdict::Pass => continue,
            Verdict::Hold => {
                debug!("arbiter: {} holds the cycle", name);
                return None;
            }
            Verdict::Act(action) => {
                debug!("arbiter: {} requests {:?}", name, action.target);
                return Some(action);
            }
        }
    }
    None
}

/// Rain while extended retracts immediately, outranking even a manual hold.
fn emergency_override(input: &ArbiterInput) -> Verdict {
    if input.rain && input.position == Position::Extended {
        return Verdict::Act(Action {
            target: Target::Retract,
            reason: ActionReason::EmergencyRain,
        });
    }
    Verdict::Pass
}

/// A manual command in flight suspends all automatic behaviour below it.
fn manual_hold(input: &ArbiterInput) -> Verdict {
    if input.manual_command_in_progress {
        return Verdict::Hold;
    }
    Verdict::Pass
}

/// Act on a debounced presence flip, per the configured policy.
fn occupancy_action(input: &ArbiterInput) -> Verdict {
    if !input.occupancy_enabled || !input.auto_enabled {
        return Verdict::Pass;
    }
    let Some(fire) = input.fire else {
        return Verdict::Pass;
    };

    let action = if input.retract_on_present {
        // Privacy: clear the line while someone is there.
        if fire.present && input.position == Position::Extended {
            Some((Target::Retract, "privacy retract"))
        } else if !fire.present && input.good_conditions && input.position == Position::Retracted {
            Some((Target::Extend, "privacy re-extend"))
        } else {
            None
        }
    } else {
        // Access: extend for the user, clear when they leave.
        if fire.present && input.good_conditions && input.position == Position::Retracted {
            Some((Target::Extend, "access extend"))
        } else if !fire.present && input.position == Position::Extended {
            Some((Target::Retract, "access retract"))
        } else {
            None
        }
    };

    match action {
        Some((target, what)) => {
            debug!("occupancy: {}", what);
            Verdict::Act(Action {
                target,
                reason: ActionReason::Occupancy,
            })
        }
        None => Verdict::Pass,
    }
}

/// Extend when retracted and conditions turn favourable — unless occupancy
/// control says someone is currently present.
fn auto_extend(input: &ArbiterInput) -> Verdict {
    if input.position == Position::Retracted
        && input.good_conditions
        && input.auto_enabled
        && !(input.occupancy_enabled && input.present)
    {
        return Verdict::Act(Action {
            target: Target::Extend,
            reason: ActionReason::AutoExtend,
        });
    }
    Verdict::Pass
}

/// Retract when extended and conditions stop being favourable.
fn auto_retract(input: &ArbiterInput) -> Verdict {
    if input.position == Position::Extended && !input.good_conditions && input.auto_enabled {
        return Verdict::Act(Action {
            target: Target::Retract,
            reason: ActionReason::AutoRetract,
        });
    }
    Verdict::Pass
}
