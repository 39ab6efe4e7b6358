//! Public-only network: one VPC, two public subnets, an internet gateway and the game port
//! security group. No NAT gateway and no private subnets.

use mcs_model::Ipv4Cidr;
use serde_json::{Value, json};

use crate::{
    Resource, StackError, Template, ids,
    template::{availability_zone, get_att, reference},
};

const VPC_CIDR: &str = "10.0.0.0/16";
const SUBNET_CIDRS: [&str; 2] = ["10.0.0.0/24", "10.0.1.0/24"];

pub(crate) fn add_network(t: &mut Template, stack: &str) -> Result<(), StackError> {
    t.add(
        ids::VPC,
        Resource::new(
            "AWS::EC2::VPC",
            json!({
                "CidrBlock": VPC_CIDR,
                "EnableDnsHostnames": true,
                "EnableDnsSupport": true,
                "Tags": [{ "Key": "Name", "Value": format!("{stack}/vpc") }]
            }),
        ),
    )?;
    t.add(ids::IGW, Resource::new("AWS::EC2::InternetGateway", json!({})))?;
    t.add(
        ids::IGW_ATTACHMENT,
        Resource::new(
            "AWS::EC2::VPCGatewayAttachment",
            json!({ "VpcId": reference(ids::VPC), "InternetGatewayId": reference(ids::IGW) }),
        ),
    )?;
    t.add(
        ids::ROUTE_TABLE,
        Resource::new(
            "AWS::EC2::RouteTable",
            json!({ "VpcId": reference(ids::VPC) }),
        ),
    )?;
    t.add(
        ids::DEFAULT_ROUTE,
        Resource::new(
            "AWS::EC2::Route",
            json!({
                "RouteTableId": reference(ids::ROUTE_TABLE),
                "DestinationCidrBlock": "0.0.0.0/0",
                "GatewayId": reference(ids::IGW)
            }),
        )
        .depends_on(ids::IGW_ATTACHMENT),
    )?;

    for (i, (subnet, cidr)) in ids::SUBNETS.iter().zip(SUBNET_CIDRS).enumerate() {
        t.add(
            subnet,
            Resource::new(
                "AWS::EC2::Subnet",
                json!({
                    "VpcId": reference(ids::VPC),
                    "CidrBlock": cidr,
                    "AvailabilityZone": availability_zone(i),
                    "MapPublicIpOnLaunch": true,
                    "Tags": [{ "Key": "Name", "Value": format!("{stack}/public-{}", i + 1) }]
                }),
            ),
        )?;
        t.add(
            ids::SUBNET_ROUTES[i],
            Resource::new(
                "AWS::EC2::SubnetRouteTableAssociation",
                json!({
                    "SubnetId": reference(subnet),
                    "RouteTableId": reference(ids::ROUTE_TABLE)
                }),
            ),
        )?;
    }
    Ok(())
}

/// Security group admitting `game_port` over TCP from each range, once per range.
pub(crate) fn add_security_group(
    t: &mut Template,
    cidrs: &[Ipv4Cidr],
    game_port: u16,
) -> Result<(), StackError> {
    let ingress: Vec<Value> = cidrs
        .iter()
        .map(|cidr| {
            json!({
                "IpProtocol": "tcp",
                "FromPort": game_port,
                "ToPort": game_port,
                "CidrIp": cidr.to_string(),
                "Description": "Minecraft server port"
            })
        })
        .collect();

    t.add(
        ids::SECURITY_GROUP,
        Resource::new(
            "AWS::EC2::SecurityGroup",
            json!({
                "GroupDescription": "Allow Minecraft traffic",
                "VpcId": reference(ids::VPC),
                "SecurityGroupIngress": ingress,
                "SecurityGroupEgress": [{
                    "IpProtocol": "-1",
                    "CidrIp": "0.0.0.0/0",
                    "Description": "Allow all outbound traffic"
                }]
            }),
        ),
    )
}

pub(crate) fn subnet_refs() -> Value {
    Value::Array(ids::SUBNETS.iter().map(|s| reference(s)).collect())
}

pub(crate) fn security_group_id() -> Value {
    get_att(ids::SECURITY_GROUP, "GroupId")
}
