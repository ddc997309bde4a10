// Email templates for weekly/monthly reports and settlement notices.
//
// English and Spanish copy; any other locale renders English.

use rust_decimal::Decimal;
use std::fmt::Write;

use crate::billing::models::{InterestTier, ReportData, SettlementNotice};

struct Strings {
    weekly_subject: &'static str,
    monthly_subject: &'static str,
    settlement_subject: &'static str,
    weekly_heading: &'static str,
    monthly_heading: &'static str,
    settlement_heading: &'static str,
    period: &'static str,
    child: &'static str,
    balance: &'static str,
    earned: &'static str,
    spent: &'static str,
    transactions: &'static str,
    interest: &'static str,
    totals: &'static str,
    debt: &'static str,
    tier: &'static str,
    rate: &'static str,
    and_above: &'static str,
    credit_limit: &'static str,
    open_app: &'static str,
    footer: &'static str,
}

const EN: Strings = Strings {
    weekly_subject: "Weekly report for",
    monthly_subject: "Monthly report for",
    settlement_subject: "Interest and credit update for",
    weekly_heading: "Your weekly family report",
    monthly_heading: "Your monthly family report",
    settlement_heading: "This month's interest and credit update",
    period: "Period",
    child: "Child",
    balance: "Balance",
    earned: "Earned",
    spent: "Spent",
    transactions: "Transactions",
    interest: "Interest",
    totals: "Totals",
    debt: "Debt",
    tier: "Tier",
    rate: "Rate",
    and_above: "and above",
    credit_limit: "Credit limit",
    open_app: "Open the app",
    footer: "You can change email preferences in your family settings.",
};

const ES: Strings = Strings {
    weekly_subject: "Informe semanal de",
    monthly_subject: "Informe mensual de",
    settlement_subject: "Actualización de intereses y crédito de",
    weekly_heading: "Tu informe familiar semanal",
    monthly_heading: "Tu informe familiar mensual",
    settlement_heading: "Intereses y crédito de este mes",
    period: "Periodo",
    child: "Hijo/a",
    balance: "Saldo",
    earned: "Ganado",
    spent: "Gastado",
    transactions: "Movimientos",
    interest: "Intereses",
    totals: "Totales",
    debt: "Deuda",
    tier: "Tramo",
    rate: "Tasa",
    and_above: "o más",
    credit_limit: "Límite de crédito",
    open_app: "Abrir la aplicación",
    footer: "Puedes cambiar tus preferencias de correo en la configuración familiar.",
};

fn strings(locale: &str) -> &'static Strings {
    match locale.split(['-', '_']).next().unwrap_or_default() {
        "es" => &ES,
        _ => &EN,
    }
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn money(amount: Decimal) -> String {
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}

fn layout(heading: &str, body: &str, app_url: &str, s: &Strings) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #222; max-width: 640px; margin: 0 auto;">
<h1 style="font-size: 22px;">{heading}</h1>
{body}
<p><a href="{url}">{open_app}</a></p>
<p style="font-size: 12px; color: #777;">{footer}</p>
</body>
</html>"#,
        heading = escape_html(heading),
        body = body,
        url = escape_html(app_url),
        open_app = s.open_app,
        footer = s.footer,
    )
}

fn report_body(data: &ReportData, s: &Strings, with_interest: bool) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<p><strong>{}</strong> &middot; {}: {} &ndash; {}</p>",
        escape_html(&data.family_name),
        s.period,
        data.period.start.format("%Y-%m-%d"),
        data.period.end.format("%Y-%m-%d"),
    );

    body.push_str(r#"<table style="width: 100%; border-collapse: collapse;"><tr>"#);
    let mut headers = vec![s.child, s.balance, s.earned, s.spent, s.transactions];
    if with_interest {
        headers.push(s.interest);
    }
    for h in headers {
        let _ = write!(body, r#"<th style="text-align: left;">{}</th>"#, h);
    }
    body.push_str("</tr>");

    for child in &data.children {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
            escape_html(&child.name),
            money(child.balance),
            money(child.earned),
            money(child.spent),
            child.transaction_count,
        );
        if with_interest {
            let _ = write!(
                body,
                "<td>{}</td>",
                money(child.interest_charged.unwrap_or_default())
            );
        }
        body.push_str("</tr>");
    }

    let _ = write!(
        body,
        "<tr><td><strong>{}</strong></td><td></td><td>{}</td><td>{}</td><td></td>{}</tr></table>",
        s.totals,
        money(data.total_earned()),
        money(data.total_spent()),
        if with_interest { "<td></td>" } else { "" },
    );
    body
}

pub fn weekly_report_subject(data: &ReportData, locale: &str) -> String {
    format!("{} {}", strings(locale).weekly_subject, data.family_name)
}

pub fn weekly_report_html(data: &ReportData, app_url: &str) -> String {
    let s = strings(&data.locale);
    layout(s.weekly_heading, &report_body(data, s, false), app_url, s)
}

pub fn monthly_report_subject(data: &ReportData, locale: &str) -> String {
    format!("{} {}", strings(locale).monthly_subject, data.family_name)
}

pub fn monthly_report_html(data: &ReportData, app_url: &str) -> String {
    let s = strings(&data.locale);
    layout(s.monthly_heading, &report_body(data, s, true), app_url, s)
}

pub fn settlement_notice_subject(notice: &SettlementNotice, locale: &str) -> String {
    format!("{} {}", strings(locale).settlement_subject, notice.family_name)
}

fn tier_row(tier: &InterestTier, s: &Strings) -> String {
    let range = match tier.max_debt {
        Some(max) => format!("{} &ndash; {}", money(tier.min_debt), money(max)),
        None => format!("{} {}", money(tier.min_debt), s.and_above),
    };
    format!(
        "<tr><td>{} {}</td><td>{}</td><td>{}</td><td>{}%</td><td>{}</td></tr>",
        s.tier,
        tier.tier_order,
        range,
        money(tier.debt_in_tier),
        tier.rate.normalize(),
        money(tier.interest_amount),
    )
}

pub fn settlement_notice_html(notice: &SettlementNotice, app_url: &str) -> String {
    let s = strings(&notice.locale);
    let mut body = String::new();
    let _ = write!(body, "<p><strong>{}</strong></p>", escape_html(&notice.family_name));

    for child in &notice.children {
        let _ = write!(
            body,
            "<h2 style=\"font-size: 18px;\">{}</h2><p>{}: {} &middot; {}: {}</p>",
            escape_html(&child.child_name),
            s.debt,
            money(child.debt_amount),
            s.interest,
            money(child.interest_calculated),
        );

        if !child.interest_tiers.is_empty() {
            body.push_str(r#"<table style="width: 100%; border-collapse: collapse;">"#);
            for tier in &child.interest_tiers {
                body.push_str(&tier_row(tier, s));
            }
            body.push_str("</table>");
        }

        let sign = if child.credit_limit_adjustment.is_sign_negative() { "" } else { "+" };
        let _ = write!(
            body,
            "<p>{}: {} &rarr; {} ({}{})</p>",
            s.credit_limit,
            money(child.credit_limit_before),
            money(child.credit_limit_after),
            sign,
            money(child.credit_limit_adjustment),
        );
    }

    layout(s.settlement_heading, &body, app_url, s)
}
