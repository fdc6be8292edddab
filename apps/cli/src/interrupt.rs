use console::style;
use konspekt_core::CancelHandle;

#[derive(Debug, PartialEq, Eq)]
pub enum Interrupt {
    Cancel,
    Exit,
}

/// First Ctrl-C cancels the running phase, any further press quits.
#[derive(Default)]
pub struct Interrupts {
    presses: u32,
}

impl Interrupts {
    pub fn press(&mut self) -> Interrupt {
        self.presses += 1;
        if self.presses == 1 {
            Interrupt::Cancel
        } else {
            Interrupt::Exit
        }
    }
}

pub fn spawn_ctrl_c_handler(cancel: CancelHandle) {
    tokio::spawn(async move {
        let mut interrupts = Interrupts::default();
        while tokio::signal::ctrl_c().await.is_ok() {
            match interrupts.press() {
                Interrupt::Cancel => {
                    cancel.cancel();
                    eprintln!("{}", style("Press Ctrl-C again to quit").dim());
                }
                Interrupt::Exit => std::process::exit(130),
            }
        }
    });
}
