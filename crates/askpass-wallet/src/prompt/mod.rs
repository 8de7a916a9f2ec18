//! Interaction frontends.
//!
//! This module provides implementations of the [`Interaction`] trait:
//!
//! - [`TerminalInteraction`]: `/dev/tty` prompts (always available)
//! - `Gtk4Interaction`: GTK4 dialogs (cargo feature `gtk`)
//!
//! [`select`] picks one from the configured [`Frontend`].

#[cfg(feature = "gtk")]
mod gtk4_prompt;
mod terminal;

#[cfg(feature = "gtk")]
pub use gtk4_prompt::Gtk4Interaction;
pub use terminal::TerminalInteraction;

use askpass_wallet_core::{Frontend, Interaction};
use tracing::{debug, warn};

/// Whether a graphical session is reachable from this process.
fn has_display(wayland: Option<&str>, x11: Option<&str>) -> bool {
    [wayland, x11]
        .iter()
        .any(|v| v.is_some_and(|v| !v.is_empty()))
}

/// Whether the GTK frontend should be used.
fn wants_gtk(frontend: Frontend, display: bool) -> bool {
    match frontend {
        Frontend::Auto => cfg!(feature = "gtk") && display,
        Frontend::Terminal => false,
        Frontend::Gtk => true,
    }
}

/// Build the interaction surface for `frontend`.
///
/// Falls back to the terminal when GTK is not compiled in or cannot start.
pub fn select(frontend: Frontend) -> Box<dyn Interaction> {
    let wayland = std::env::var("WAYLAND_DISPLAY").ok();
    let x11 = std::env::var("DISPLAY").ok();
    let display = has_display(wayland.as_deref(), x11.as_deref());

    if wants_gtk(frontend, display) {
        #[cfg(feature = "gtk")]
        {
            match Gtk4Interaction::new() {
                Ok(gtk) => {
                    debug!("Using GTK4 frontend");
                    return Box::new(gtk);
                }
                Err(e) => warn!(error = %e, "GTK unavailable, falling back to terminal"),
            }
        }

        #[cfg(not(feature = "gtk"))]
        {
            warn!("Built without GTK support, falling back to terminal");
        }
    }

    debug!("Using terminal frontend");
    Box::new(TerminalInteraction::new())
}
