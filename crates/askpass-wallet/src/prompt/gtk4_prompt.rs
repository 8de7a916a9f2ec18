//! GTK4 dialogs.
//!
//! Two small modal windows:
//!
//! - text entry: label, masked or plain entry, optional "Remember in wallet"
//!   check button, Cancel and OK buttons
//! - confirmation: label, Cancel and Accept buttons
//!
//! Each dialog runs a `glib::MainLoop` until a button or the window's close
//! request settles the reply.

use std::cell::RefCell;
use std::rc::Rc;

use askpass_wallet_core::{ConfirmRequest, Interaction, InteractionError, SecretReply, SecretRequest};
use gtk4::glib;
use gtk4::prelude::*;
use secrecy::SecretString;
use tracing::debug;

/// GTK4-based interaction.
pub struct Gtk4Interaction;

impl Gtk4Interaction {
    /// Initialize GTK.
    ///
    /// # Errors
    ///
    /// Returns `InteractionError::Unavailable` if no display can be opened.
    pub fn new() -> Result<Self, InteractionError> {
        if gtk4::is_initialized() {
            debug!("GTK already initialized, reusing");
        } else {
            debug!("Initializing GTK");
            gtk4::init().map_err(|e| {
                InteractionError::Unavailable(format!("GTK init failed: {}", e))
            })?;
        }
        Ok(Self)
    }
}

/// Holds the first reply and stops the main loop.
struct Settle<T> {
    slot: Rc<RefCell<Option<T>>>,
    main_loop: glib::MainLoop,
}

impl<T> Clone for Settle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
            main_loop: self.main_loop.clone(),
        }
    }
}

impl<T> Settle<T> {
    fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(None)),
            main_loop: glib::MainLoop::new(None, false),
        }
    }

    fn set(&self, value: T) {
        {
            let mut slot = self.slot.borrow_mut();
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        self.main_loop.quit();
    }

    /// Present `window` and wait for a reply.
    fn wait(&self, window: &gtk4::Window) -> Option<T> {
        window.present();
        self.main_loop.run();
        window.destroy();
        // Let GTK process the destroy before returning.
        let context = glib::MainContext::default();
        while context.iteration(false) {}
        self.slot.borrow_mut().take()
    }
}

fn dialog_window(title: &str) -> gtk4::Window {
    gtk4::Window::builder()
        .title(title)
        .default_width(400)
        .modal(true)
        .resizable(false)
        .build()
}

fn content_box() -> gtk4::Box {
    gtk4::Box::builder()
        .orientation(gtk4::Orientation::Vertical)
        .spacing(12)
        .margin_top(20)
        .margin_bottom(20)
        .margin_start(20)
        .margin_end(20)
        .build()
}

fn button_row(cancel: &gtk4::Button, accept: &gtk4::Button) -> gtk4::Box {
    let row = gtk4::Box::builder()
        .orientation(gtk4::Orientation::Horizontal)
        .spacing(12)
        .halign(gtk4::Align::End)
        .margin_top(12)
        .build();
    row.append(cancel);
    row.append(accept);
    row
}

impl Interaction for Gtk4Interaction {
    fn request_secret(&self, request: SecretRequest) -> Result<SecretReply, InteractionError> {
        let settle: Settle<Result<SecretReply, InteractionError>> = Settle::new();
        let window = dialog_window(&request.title);
        let vbox = content_box();

        let label = gtk4::Label::builder()
            .label(request.prompt_text.as_str())
            .wrap(true)
            .xalign(0.0)
            .build();
        vbox.append(&label);

        let purpose = if request.echo {
            gtk4::InputPurpose::FreeForm
        } else {
            gtk4::InputPurpose::Password
        };
        let entry = gtk4::Entry::builder()
            .visibility(request.echo)
            .input_purpose(purpose)
            .activates_default(true)
            .build();
        vbox.append(&entry);

        let remember_check = if request.show_remember_checkbox {
            let check = gtk4::CheckButton::builder()
                .label("Remember in wallet")
                .active(request.default_remember)
                .build();
            vbox.append(&check);
            Some(check)
        } else {
            None
        };

        let cancel_button = gtk4::Button::builder().label("Cancel").build();
        let ok_button = gtk4::Button::builder()
            .label("OK")
            .css_classes(["suggested-action"])
            .build();
        vbox.append(&button_row(&cancel_button, &ok_button));
        window.set_child(Some(&vbox));
        window.set_default_widget(Some(&ok_button));

        let settle_cancel = settle.clone();
        cancel_button.connect_clicked(move |_| {
            settle_cancel.set(Err(InteractionError::Cancelled));
        });

        let settle_ok = settle.clone();
        let entry_ok = entry.clone();
        ok_button.connect_clicked(move |_| {
            let value = entry_ok.text().to_string();
            entry_ok.set_text("");
            let remember = remember_check
                .as_ref()
                .map(|c| c.is_active())
                .unwrap_or(false);
            settle_ok.set(Ok(SecretReply {
                value: SecretString::from(value),
                remember,
            }));
        });

        let settle_close = settle.clone();
        window.connect_close_request(move |_| {
            settle_close.set(Err(InteractionError::Cancelled));
            glib::Propagation::Proceed
        });

        entry.grab_focus();
        settle.wait(&window).unwrap_or(Err(InteractionError::Cancelled))
    }

    fn confirm(&self, request: ConfirmRequest) -> Result<(), InteractionError> {
        let settle: Settle<Result<(), InteractionError>> = Settle::new();
        let window = dialog_window(&request.title);
        let vbox = content_box();

        let label = gtk4::Label::builder()
            .label(request.question.as_str())
            .wrap(true)
            .xalign(0.0)
            .build();
        vbox.append(&label);

        let cancel_button = gtk4::Button::builder().label("Cancel").build();
        let accept_button = gtk4::Button::builder()
            .label("Accept")
            .css_classes(["suggested-action"])
            .build();
        vbox.append(&button_row(&cancel_button, &accept_button));
        window.set_child(Some(&vbox));

        let settle_cancel = settle.clone();
        cancel_button.connect_clicked(move |_| {
            settle_cancel.set(Err(InteractionError::Rejected));
        });

        let settle_accept = settle.clone();
        accept_button.connect_clicked(move |_| {
            settle_accept.set(Ok(()));
        });

        let settle_close = settle.clone();
        window.connect_close_request(move |_| {
            settle_close.set(Err(InteractionError::Cancelled));
            glib::Propagation::Proceed
        });

        cancel_button.grab_focus();
        settle.wait(&window).unwrap_or(Err(InteractionError::Cancelled))
    }
}
