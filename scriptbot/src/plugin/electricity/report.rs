//! Human-readable replies.

use std::fmt::Write;

use time::macros::format_description;
use wanxiao::Usage;

use super::bindings::BindingStore;
use super::resolver::{self, Registration};

/// Reply to a query without arguments.
pub const USAGE: &str = "请输入学号，格式：.电费 20225080905096";
/// Reply to an unbind without arguments.
pub const UNBIND_USAGE: &str = "用法：.电费解绑 <快捷码>";
/// The number of most recent days included in a reply.
const RECENT_DAYS: usize = 7;

/// How urgently the balance needs topping up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Below 10 kWh.
    Severe,
    /// Below 20 kWh.
    Low,
    /// Below 50 kWh.
    Advisory,
    /// 50 kWh or more.
    Sufficient,
}

impl Tier {
    /// Returns the tier of the given balance.
    #[must_use]
    pub fn for_balance(balance: f64) -> Tier {
        if balance < 10.0 {
            Tier::Severe
        } else if balance < 20.0 {
            Tier::Low
        } else if balance < 50.0 {
            Tier::Advisory
        } else {
            Tier::Sufficient
        }
    }

    /// Returns the warning shown for this tier, if any.
    #[must_use]
    pub const fn warning(self) -> Option<&'static str> {
        match self {
            Tier::Severe => Some("⚠️ 电量严重不足，请立即充值！"),
            Tier::Low => Some("⚠️ 电量偏低，请尽快充值"),
            Tier::Advisory => Some("💡 电量不多了，注意及时充值"),
            Tier::Sufficient => None,
        }
    }
}

/// Formats a successful query.
#[must_use]
pub fn usage(usage: &Usage) -> String {
    let mut lines = vec!["电费查询成功！".to_string()];

    if usage.room.is_empty() {
        lines.push("房间号: 未知房间".to_string());
    } else {
        lines.push(format!("房间号: {}", usage.room));
    }

    lines.push(format!("当前电量: {:.2} 度", usage.balance));

    if let Some(warning) = Tier::for_balance(usage.balance).warning() {
        lines.push(warning.to_string());
    }

    let recent = &usage.weekly[usage.weekly.len().saturating_sub(RECENT_DAYS)..];

    if !recent.is_empty() {
        lines.push("最近一周用电情况:".to_string());

        for day in recent {
            lines.push(format!(
                "{} ({}): {} 度",
                day.date.as_deref().unwrap_or("未知日期"),
                day.weekday.as_deref().unwrap_or("未知"),
                day.usage.as_deref().unwrap_or("0"),
            ));
        }
    }

    lines.join("\n")
}

/// Formats the shortcut outcome appended to a full-account query.
#[must_use]
pub fn registration(registration: &Registration) -> String {
    match registration {
        Registration::Existing(shortcut) => {
            format!("快捷码: {shortcut}，下次可直接使用 .电费 {shortcut} 查询")
        }
        Registration::Created(shortcut) => {
            format!("已为您生成快捷码: {shortcut}，下次可直接使用 .电费 {shortcut} 查询")
        }
        Registration::Exhausted => "无法为该学号分配快捷码，请继续使用完整学号查询".to_string(),
    }
}

/// Formats a failed query.
#[must_use]
pub fn failure(err: &resolver::Error) -> String {
    format!("查询失败！错误信息: {}", reason(err))
}

/// Returns the user-facing reason of a failed query.
#[must_use]
pub fn reason(err: &resolver::Error) -> String {
    use wanxiao::Error as Remote;

    match err {
        resolver::Error::InvalidAccount(_) => {
            "学号格式错误，只能包含字母、数字、- 和 _，且不超过 20 位".to_string()
        }
        resolver::Error::ShortcutNotFound(code) => {
            format!("快捷码 {code} 不存在，请先使用完整学号查询")
        }
        resolver::Error::Query(err) => match err {
            Remote::EmptyAccount => "学号不能为空".to_string(),
            Remote::Timeout(_) => "请求超时".to_string(),
            Remote::Request(err) => format!("网络请求失败: {err}"),
            Remote::Status(status) => format!("HTTP请求失败 ({status})"),
            Remote::Envelope(_) | Remote::Body(_) | Remote::MissingBody => {
                "数据格式错误".to_string()
            }
            Remote::Rejected { message, .. } if message.trim().is_empty() => {
                "未知错误".to_string()
            }
            Remote::Rejected { message, .. } => message.clone(),
            Remote::Unbound => "该学号未绑定房间号".to_string(),
            Remote::BalanceNotFound => "未找到电量信息".to_string(),
            Remote::BalanceOutOfRange(raw) => format!("电量数值异常: {raw}"),
            Remote::BuildClient(_) => "系统错误".to_string(),
        },
    }
}

/// Formats the list of bindings.
#[must_use]
pub fn bindings(store: &BindingStore) -> String {
    if store.is_empty() {
        return "当前没有绑定的快捷码".to_string();
    }

    let date_format = format_description!("[year]-[month]-[day]");
    let mut text = format!("已绑定的快捷码 ({}):", store.len());

    for (shortcut, binding) in store.bindings() {
        let _ = write!(text, "\n{shortcut} -> {}", binding.account);

        if !binding.room_name.trim().is_empty() {
            let _ = write!(text, " ({})", binding.room_name);
        }

        if let Some(date) = binding
            .created()
            .and_then(|created| created.format(&date_format).ok())
        {
            let _ = write!(text, " 绑定于 {date}");
        }
    }

    text
}

/// Formats the outcome of an unbind.
#[must_use]
pub fn unbind(shortcut: &str, removed: bool) -> String {
    if removed {
        format!("解除绑定成功！快捷码 {shortcut} 已删除")
    } else {
        format!("解除绑定失败！未找到快捷码 {shortcut}")
    }
}

#[cfg(test)]
mod tests {
    use wanxiao::{DailyUsage, Room};

    use super::*;

    fn usage_with_balance(balance: f64) -> Usage {
        Usage {
            room: Room::Name("西区 3 栋 402".to_string()),
            balance,
            weekly: vec![],
        }
    }

    #[test]
    fn tier_boundaries_are_exact() {
        let cases = [
            (0.0, Tier::Severe),
            (9.99, Tier::Severe),
            (10.00, Tier::Low),
            (19.99, Tier::Low),
            (20.00, Tier::Advisory),
            (49.99, Tier::Advisory),
            (50.00, Tier::Sufficient),
            (99999.0, Tier::Sufficient),
        ];

        for (balance, expected) in cases {
            assert_eq!(Tier::for_balance(balance), expected, "balance {balance}");
        }
    }

    #[test]
    fn balance_has_two_decimals() {
        let text = usage(&usage_with_balance(56.3));

        assert!(text.contains("当前电量: 56.30 度"));
        assert!(!text.contains("⚠️"));
        assert!(!text.contains("💡"));
    }

    #[test]
    fn warning_follows_tier() {
        assert!(usage(&usage_with_balance(9.99)).contains("电量严重不足"));
        assert!(usage(&usage_with_balance(10.0)).contains("电量偏低"));
        assert!(usage(&usage_with_balance(20.0)).contains("电量不多了"));
    }

    #[test]
    fn unknown_room_is_labelled() {
        let mut result = usage_with_balance(60.0);
        result.room = Room::Parts(vec![]);

        assert!(usage(&result).contains("房间号: 未知房间"));
    }

    #[test]
    fn only_recent_days_are_shown() {
        let mut result = usage_with_balance(60.0);
        result.weekly = (1..=9)
            .map(|day| DailyUsage {
                date: Some(format!("2024-05-0{day}")),
                usage: Some(day.to_string()),
                weekday: None,
            })
            .collect();

        let text = usage(&result);

        assert!(!text.contains("2024-05-02"));
        assert!(text.contains("2024-05-03 (未知): 3 度"));
        assert!(text.contains("2024-05-09 (未知): 9 度"));
    }

    #[test]
    fn reasons_are_user_facing() {
        let not_found = resolver::Error::ShortcutNotFound("12".to_string());
        let unbound = resolver::Error::Query(wanxiao::Error::Unbound);
        let range = resolver::Error::Query(wanxiao::Error::BalanceOutOfRange("-3".to_string()));
        let rejected = resolver::Error::Query(wanxiao::Error::Rejected {
            code: "1".to_string(),
            message: String::new(),
        });

        assert_eq!(reason(&not_found), "快捷码 12 不存在，请先使用完整学号查询");
        assert_eq!(reason(&unbound), "该学号未绑定房间号");
        assert_eq!(reason(&range), "电量数值异常: -3");
        assert_eq!(reason(&rejected), "未知错误");
    }

    #[tokio::test]
    async fn bindings_listing() {
        let mut store = BindingStore::in_memory();

        assert_eq!(bindings(&store), "当前没有绑定的快捷码");

        store.add("5096", "20225080905096", "西区 402").await;
        store.add("1234", "20211111111234", "").await;

        let text = bindings(&store);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "已绑定的快捷码 (2):");
        assert!(lines[1].starts_with("1234 -> 20211111111234 绑定于 "));
        assert!(lines[2].starts_with("5096 -> 20225080905096 (西区 402) 绑定于 "));
    }
}
