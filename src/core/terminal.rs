use console::{Emoji, style};

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static INFO_ICON: Emoji<'_, '_> = Emoji("ℹ️  ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static GLOBE: Emoji<'_, '_> = Emoji("🌐 ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

pub fn print_success(msg: &str) {
    println!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_info(msg: &str) {
    println!("{} {}", INFO_ICON, style(msg).blue());
}

pub fn print_warn(msg: &str) {
    println!("{} {}", WARN_ICON, style(msg).yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_status(label: &str, msg: &str) {
    println!("  {} {}: {}", GEAR, style(label).bold().cyan(), msg);
}

pub fn print_step(step: &str) {
    println!("{} {}", SPARKLE, style(step).bold());
}

pub fn print_link(label: &str, url: &str) {
    println!(
        "  {} {}: {}",
        GLOBE,
        style(label).bold(),
        style(url).underlined().cyan()
    );
}

/// A titled group of commands in the help screen.
pub struct GuideSection {
    title: &'static str,
    commands: Vec<(&'static str, &'static str)>,
}

impl GuideSection {
    pub fn new(title: &'static str) -> Self {
        Self {
            title,
            commands: Vec::new(),
        }
    }

    pub fn command(mut self, name: &'static str, about: &'static str) -> Self {
        self.commands.push((name, about));
        self
    }

    pub fn print(&self) {
        println!(" {}", style(self.title).bold().underlined());
        let width = self.commands.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
        for (name, about) in &self.commands {
            println!(
                "   {}  {}",
                style(format!("{:<width$}", name, width = width)).green(),
                style(about).dim()
            );
        }
        println!();
    }
}

pub fn print_banner() {
    let lines: &[&str] = &[
        "                          __  _____               ",
        "  ____ ___  _____  _____/ /_/ __/ /___ _      __ ",
        " / __ `/ / / / _ \\/ ___/ __/ /_/ / __ \\ | /| / / ",
        "/ /_/ / /_/ /  __(__  ) /_/ __/ / /_/ / |/ |/ /  ",
        "\\__, /\\__,_/\\___/____/\\__/_/ /_/\\____/|__/|__/   ",
        "  /_/                                            ",
    ];

    // Gradient: #34d399 → #22d3ee → #818cf8 (left to right)
    let stops: [(u8, u8, u8); 3] = [(52, 211, 153), (34, 211, 238), (129, 140, 248)];
    let max_w = lines.iter().map(|l| l.len()).max().unwrap_or(1) as u32;

    println!();
    for line in lines {
        for (x, ch) in line.chars().enumerate() {
            if ch == ' ' {
                print!(" ");
                continue;
            }
            let d = (x as u32 * 1000 / max_w).min(1000);
            let (r, g, b) = if d <= 500 {
                lerp_color(stops[0], stops[1], d * 2)
            } else {
                lerp_color(stops[1], stops[2], (d - 500) * 2)
            };
            print!("\x1b[38;2;{};{};{}m{}", r, g, b, ch);
        }
        println!();
    }
    print!("\x1b[0m");

    println!("\x1b[38;2;34;211;238mQuestionnaires that pick up the phone.\x1b[0m\n");
}

fn lerp_color(a: (u8, u8, u8), b: (u8, u8, u8), t: u32) -> (u8, u8, u8) {
    let mix = |x: u8, y: u8| ((x as u32 * (1000 - t) + y as u32 * t) / 1000) as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

pub fn print_goodbye() {
    println!(
        "\n{} {}",
        SPARKLE,
        style("questflow stopped. See you next time!").bold().cyan()
    );
}
