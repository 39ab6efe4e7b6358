use serde_json::{Value, json};

use crate::{Resource, StackError, Template, ids, template::sub};

const ACTUAL_THRESHOLD: u32 = 80;
const FORECAST_THRESHOLD: u32 = 100;

fn notification(kind: &str, threshold: u32, email: &str) -> Value {
    json!({
        "Notification": {
            "NotificationType": kind,
            "ComparisonOperator": "GREATER_THAN",
            "Threshold": threshold,
            "ThresholdType": "PERCENTAGE"
        },
        "Subscribers": [{ "SubscriptionType": "EMAIL", "Address": email }]
    })
}

/// Monthly cost budget that mails `email` at 80% actual and 100% forecasted spend.
pub(crate) fn add_budget(t: &mut Template, amount: f64, email: &str) -> Result<(), StackError> {
    t.add(
        ids::BUDGET,
        Resource::new(
            "AWS::Budgets::Budget",
            json!({
                "Budget": {
                    "BudgetName": sub("${AWS::StackName}-monthly"),
                    "BudgetType": "COST",
                    "TimeUnit": "MONTHLY",
                    "BudgetLimit": { "Amount": amount, "Unit": "USD" }
                },
                "NotificationsWithSubscribers": [
                    notification("ACTUAL", ACTUAL_THRESHOLD, email),
                    notification("FORECASTED", FORECAST_THRESHOLD, email)
                ]
            }),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_alerts_actual_and_forecast() {
        let mut t = Template::new("t");
        add_budget(&mut t, 15.0, "ops@example.com").unwrap();

        let b = &t.resource(ids::BUDGET).unwrap().properties;
        assert_eq!(b["Budget"]["BudgetLimit"]["Amount"], 15.0);
        let n = b["NotificationsWithSubscribers"].as_array().unwrap();
        assert_eq!(n.len(), 2);
        assert_eq!(n[0]["Notification"]["NotificationType"], "ACTUAL");
        assert_eq!(n[0]["Notification"]["Threshold"], 80);
        assert_eq!(n[1]["Notification"]["NotificationType"], "FORECASTED");
        assert_eq!(n[1]["Notification"]["Threshold"], 100);
        assert_eq!(n[1]["Subscribers"][0]["Address"], "ops@example.com");
    }
}
