//! Slack mrkdwn text for IRC happenings.

/// `/me` action, posted under the acting user's name.
pub fn action(nick: &str, text: &str) -> String {
    format!("> *{} {}*", nick, text)
}

pub fn join(nick: &str, mask: &str) -> String {
    format!("> *{}* ({}) joined the channel", nick, mask)
}

pub fn part(nick: &str, mask: &str) -> String {
    format!("> *{}* ({}) left the channel", nick, mask)
}

pub fn kick(kicker: &str, kickee: &str, reason: &str) -> String {
    format!("> *{}* kicked *{}* from the channel ({})", kicker, kickee, reason)
}

/// Channel mode change. Arguments are left out when the mode has none.
pub fn mode(nick: &str, mode: &str, args: &[String]) -> String {
    if args.is_empty() {
        format!("> *{}* sets *{}*", nick, mode)
    } else {
        format!("> *{}* sets *{}* *{}*", nick, mode, args.join(" "))
    }
}

pub fn nick_change(old_nick: &str, new_nick: &str) -> String {
    format!("> {} is now known as *{}*", old_nick, new_nick)
}

pub fn quit(nick: &str, mask: &str, reason: &str) -> String {
    format!("> *{}* ({}) left IRC ({})", nick, mask, reason)
}

pub fn topic(nick: &str, topic: &str) -> String {
    format!("> *{}* changed the topic to *{}*", nick, topic)
}

/// Owner ping, posted by the bridge ahead of the message that caused it.
pub fn highlight(owner: &str, nick: &str) -> String {
    format!("@{}: you were pinged by {}", owner, nick)
}

pub fn connected(server: &str) -> String {
    format!("Connected to IRC on {}!", server)
}

pub fn disconnected(server: &str) -> String {
    format!("Disconnected from IRC on {}!", server)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_notices() {
        assert_eq!(
            join("alice", "alice!a@host"),
            "> *alice* (alice!a@host) joined the channel"
        );
        assert_eq!(
            part("alice", "alice!a@host"),
            "> *alice* (alice!a@host) left the channel"
        );
        assert_eq!(
            kick("op", "alice", "spam"),
            "> *op* kicked *alice* from the channel (spam)"
        );
        assert_eq!(
            quit("alice", "alice!a@host", "Ping timeout"),
            "> *alice* (alice!a@host) left IRC (Ping timeout)"
        );
        assert_eq!(nick_change("alice", "alicia"), "> alice is now known as *alicia*");
    }

    #[test]
    fn test_mode_notice() {
        assert_eq!(
            mode("op", "+o", &["alice".to_string()]),
            "> *op* sets *+o* *alice*"
        );
        assert_eq!(
            mode("op", "+ov", &["alice".to_string(), "bob".to_string()]),
            "> *op* sets *+ov* *alice bob*"
        );
        assert_eq!(mode("op", "+m", &[]), "> *op* sets *+m*");
    }

    #[test]
    fn test_other_notices() {
        assert_eq!(action("alice", "waves"), "> *alice waves*");
        assert_eq!(topic("op", "release day"), "> *op* changed the topic to *release day*");
        assert_eq!(highlight("kenny", "admin"), "@kenny: you were pinged by admin");
        assert_eq!(connected("irc.example.net"), "Connected to IRC on irc.example.net!");
    }
}
