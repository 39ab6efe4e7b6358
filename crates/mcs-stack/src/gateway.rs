use serde_json::json;

use crate::{
    Resource, StackError, Template, ids,
    template::{allow, assume_role, get_att, policy, reference},
};

/// HTTP API with `/start` and `/stop` (GET and POST) starting the workflows, and `/status`
/// answered synchronously by the express machine.
pub(crate) fn add_http_api(t: &mut Template, stack: &str) -> Result<(), StackError> {
    t.add(
        ids::API,
        Resource::new(
            "AWS::ApiGatewayV2::Api",
            json!({
                "Name": format!("{stack}-control"),
                "ProtocolType": "HTTP",
                "Description": "Minecraft Server Control API"
            }),
        ),
    )?;
    t.add(
        ids::API_STAGE,
        Resource::new(
            "AWS::ApiGatewayV2::Stage",
            json!({ "ApiId": reference(ids::API), "StageName": "$default", "AutoDeploy": true }),
        ),
    )?;
    t.add(
        ids::API_ROLE,
        Resource::new(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": assume_role("apigateway.amazonaws.com"),
                "Policies": [policy("StartServerWorkflows", vec![
                    allow(
                        &["states:StartExecution"],
                        json!([reference(ids::START_MACHINE), reference(ids::STOP_MACHINE)]),
                    ),
                    allow(&["states:StartSyncExecution"], json!([reference(ids::STATUS_MACHINE)])),
                ])]
            }),
        ),
    )?;

    let routes = [
        (ids::API_START, ids::START_MACHINE, "StepFunctions-StartExecution", "start", &["GET", "POST"][..]),
        (ids::API_STOP, ids::STOP_MACHINE, "StepFunctions-StartExecution", "stop", &["GET", "POST"][..]),
        (ids::API_STATUS, ids::STATUS_MACHINE, "StepFunctions-StartSyncExecution", "status", &["GET"][..]),
    ];
    for (integration, machine, subtype, path, methods) in routes {
        t.add(
            integration,
            Resource::new(
                "AWS::ApiGatewayV2::Integration",
                json!({
                    "ApiId": reference(ids::API),
                    "IntegrationType": "AWS_PROXY",
                    "IntegrationSubtype": subtype,
                    "PayloadFormatVersion": "1.0",
                    "CredentialsArn": get_att(ids::API_ROLE, "Arn"),
                    "RequestParameters": { "StateMachineArn": reference(machine) }
                }),
            ),
        )?;
        for method in methods {
            let capitalized = format!("{}{}", &path[..1].to_ascii_uppercase(), &path[1..]);
            let method_name = format!("{}{}", &method[..1], &method[1..].to_ascii_lowercase());
            t.add(
                &format!("{}{method_name}{capitalized}Route", ids::API),
                Resource::new(
                    "AWS::ApiGatewayV2::Route",
                    json!({
                        "ApiId": reference(ids::API),
                        "RouteKey": format!("{method} /{path}"),
                        "Target": { "Fn::Join": ["/", ["integrations", reference(integration)]] }
                    }),
                ),
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_cover_start_stop_and_status() {
        let mut t = Template::new("t");
        add_http_api(&mut t, "MinecraftServer").unwrap();

        let mut keys: Vec<String> = t
            .of_type("AWS::ApiGatewayV2::Route")
            .map(|(_, r)| r.properties["RouteKey"].as_str().unwrap().to_string())
            .collect();
        keys.sort();
        assert_eq!(
            keys,
            ["GET /start", "GET /status", "GET /stop", "POST /start", "POST /stop"]
        );
        assert!(t.resource("MinecraftApiPostStartRoute").is_some());
    }

    #[test]
    fn integrations_start_state_machines() {
        let mut t = Template::new("t");
        add_http_api(&mut t, "MinecraftServer").unwrap();

        let start = &t.resource(ids::API_START).unwrap().properties;
        assert_eq!(start["IntegrationSubtype"], "StepFunctions-StartExecution");
        assert_eq!(start["RequestParameters"]["StateMachineArn"]["Ref"], ids::START_MACHINE);

        let status = &t.resource(ids::API_STATUS).unwrap().properties;
        assert_eq!(status["IntegrationSubtype"], "StepFunctions-StartSyncExecution");
    }
}
