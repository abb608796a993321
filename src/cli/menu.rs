//! Interactive menu for ciciot-dl

/// One entry of the numbered menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    ProcessCsv,
    ProcessPcap,
    Cleanup,
    Exit,
}

impl MenuChoice {
    /// Parse a line of user input; `None` for anything unrecognised
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::ProcessCsv),
            "2" => Some(MenuChoice::ProcessPcap),
            "3" => Some(MenuChoice::Cleanup),
            "0" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

pub const MENU: &str = "
        ========================================
        CIC IoT Dataset Processing Tool
        ========================================
        Select an option:
        [1] Process CSV Files (Download & Merge)
        [2] Process PCAP Files (Download & Merge)
        [3] Delete Downloaded & Merged Data
        [0] Exit
        ========================================
";

pub fn print_menu() {
    eprintln!("{MENU}");
}
