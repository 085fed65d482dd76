use std::collections::HashMap;

/// Menu section a command is listed under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Pairing,
    Admin,
    Media,
    Ai,
    Tools,
    WhatsApp,
    Religious,
    Info,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Self::Pairing,
        Self::Admin,
        Self::Media,
        Self::Ai,
        Self::Tools,
        Self::WhatsApp,
        Self::Religious,
        Self::Info,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Pairing => "📱 *PAIRING COMMANDS*",
            Self::Admin => "👑 *ADMIN COMMANDS* (Owner Only)",
            Self::Media => "📥 *MEDIA DOWNLOADERS*",
            Self::Ai => "🤖 *AI TOOLS*",
            Self::Tools => "🛠️ *UTILITY TOOLS*",
            Self::WhatsApp => "📱 *WHATSAPP ENHANCERS*",
            Self::Religious => "⛪ *RELIGIOUS TOOLS*",
            Self::Info => "ℹ️ *INFO COMMANDS*",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub category: Category,
    pub owner_only: bool,
    pub group_only: bool,
    /// Argument synopsis shown after the name, e.g. `[url]`.
    pub usage: &'static str,
    pub summary: &'static str,
}

const fn public(
    name: &'static str,
    category: Category,
    usage: &'static str,
    summary: &'static str,
) -> CommandDescriptor {
    CommandDescriptor {
        name,
        category,
        owner_only: false,
        group_only: false,
        usage,
        summary,
    }
}

const fn owner(
    name: &'static str,
    category: Category,
    usage: &'static str,
    summary: &'static str,
) -> CommandDescriptor {
    CommandDescriptor {
        owner_only: true,
        ..public(name, category, usage, summary)
    }
}

const fn owner_in_group(
    name: &'static str,
    category: Category,
    usage: &'static str,
    summary: &'static str,
) -> CommandDescriptor {
    CommandDescriptor {
        group_only: true,
        ..owner(name, category, usage, summary)
    }
}

use Category::*;

/// Every command the bot knows, in menu order.
pub const BUILTIN_COMMANDS: &[CommandDescriptor] = &[
    public("pairqr", Pairing, "", "Pairing instructions"),
    owner("getsession", Pairing, "", "Export current session"),
    owner("setsession", Pairing, "[data]", "Import session data"),
    public("pair", Pairing, "", "Pairing instructions"),
    public("pair2", Pairing, "", "Alternative pairing instructions"),
    owner("ban", Admin, "[number]", "Ban a user"),
    owner("unban", Admin, "[number]", "Unban a user"),
    owner("listban", Admin, "", "List banned users"),
    owner("broadcast", Admin, "[message]", "Broadcast to all chats"),
    owner("msg", Admin, "[number] [text]", "Send DM to number"),
    owner_in_group("promote", Admin, "[jid]", "Promote group member"),
    owner_in_group("demote", Admin, "[jid]", "Demote group admin"),
    owner_in_group("kick", Admin, "[jid]", "Remove from group"),
    owner("groupinfo", Admin, "[id]", "Get group information"),
    public("ytmp3", Media, "[url]", "Download YouTube audio"),
    public("ytmp4", Media, "[url]", "Download YouTube video"),
    public("tiktokdl", Media, "[url]", "Download TikTok video"),
    public("snapinsta", Media, "[url]", "Download Instagram media"),
    public("fbdl", Media, "[url]", "Download Facebook video"),
    public("fetch", Media, "[url]", "Fetch any media file"),
    public("apkplay", Media, "[name]", "Get Play Store app"),
    public("apkpure", Media, "[name]", "Get APK from APKPure"),
    public("nkiridl", Media, "[movie]", "Download movie"),
    public("shazam", Media, "[video]", "Identify music"),
    public("ai", Ai, "[prompt]", "ChatGPT AI assistant"),
    public("gemini", Ai, "[prompt]", "Google Gemini AI"),
    public("metaai", Ai, "[prompt]", "Meta AI assistant"),
    public("bard", Ai, "[prompt]", "Google Bard AI"),
    public("buildweb", Ai, "[spec]", "Build website"),
    public("buildapp", Ai, "[spec]", "Build mobile app"),
    public("html2apk", Ai, "[html]", "Convert HTML to APK"),
    public("web2apk", Ai, "[url]", "Convert website to APK"),
    public("calc", Tools, "[expression]", "Calculator"),
    public("bugmenu", Tools, "", "Bug report menu"),
    public("emoji", Tools, "[text]", "Convert to emoji"),
    public("font", Tools, "[text]", "Stylish fonts"),
    public("remind", Tools, "[time] [msg]", "Set reminder"),
    public("reminders", Tools, "", "List your reminders"),
    public("cancelreminder", Tools, "[id]", "Cancel a reminder"),
    public("statusviewer", WhatsApp, "[jid]", "View status"),
    public("antiviewonce", WhatsApp, "on/off", "Anti view once"),
    public("autotype", WhatsApp, "on/off", "Auto typing"),
    public("autoreply", WhatsApp, "on/off", "Auto reply with AI"),
    public("sermon", Religious, "", "Latest sermon"),
    public("menu", Info, "", "Full command list"),
    public("about", Info, "", "About this bot"),
    public("alive", Info, "", "Check if bot is active"),
    public("support", Info, "", "Contact support"),
    public("repo", Info, "", "Repository information"),
    public("version", Info, "", "Bot version info"),
    public("help", Info, "", "Help information"),
];

/// Read-only name → descriptor table, built once at startup.
#[derive(Clone, Debug)]
pub struct CommandRegistry {
    by_name: HashMap<&'static str, CommandDescriptor>,
    order: Vec<&'static str>,
}

impl CommandRegistry {
    pub fn builtin() -> Self {
        Self::from_descriptors(BUILTIN_COMMANDS)
    }

    /// Later duplicates replace earlier ones but keep the first position.
    pub fn from_descriptors(descriptors: &[CommandDescriptor]) -> Self {
        let mut by_name = HashMap::with_capacity(descriptors.len());
        let mut order = Vec::with_capacity(descriptors.len());
        for d in descriptors {
            if by_name.insert(d.name, *d).is_none() {
                order.push(d.name);
            }
        }
        Self { by_name, order }
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandDescriptor> {
        self.by_name
            .get(name)
            .or_else(|| self.by_name.get(name.to_lowercase().as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> + '_ {
        self.order.iter().filter_map(|n| self.by_name.get(n))
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &CommandDescriptor> + '_ {
        self.iter().filter(move |d| d.category == category)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let reg = CommandRegistry::builtin();
        assert!(reg.is_known("ban"));
        assert!(reg.is_known("BaN"));
        assert!(!reg.is_known("bananas"));
        assert!(!reg.is_known(""));

        let ban = reg.lookup("BAN").unwrap();
        assert_eq!(ban.category, Category::Admin);
        assert!(ban.owner_only);
        assert!(!ban.group_only);
    }

    #[test]
    fn group_management_is_owner_and_group_only() {
        let reg = CommandRegistry::builtin();
        for name in ["promote", "demote", "kick"] {
            let d = reg.lookup(name).unwrap();
            assert!(d.owner_only && d.group_only, "{name}");
        }
        assert!(!reg.lookup("groupinfo").unwrap().group_only);
    }

    #[test]
    fn every_admin_command_is_owner_only() {
        let reg = CommandRegistry::builtin();
        assert!(reg.in_category(Category::Admin).all(|d| d.owner_only));
        assert_eq!(reg.in_category(Category::Admin).count(), 9);
    }

    #[test]
    fn iteration_keeps_table_order_and_names_are_unique() {
        let reg = CommandRegistry::builtin();
        assert_eq!(reg.len(), BUILTIN_COMMANDS.len());
        let names: Vec<_> = reg.iter().map(|d| d.name).collect();
        assert_eq!(names.first(), Some(&"pairqr"));
        assert_eq!(names.last(), Some(&"help"));
        assert!(names.iter().all(|n| *n == n.to_lowercase()));
    }
}
