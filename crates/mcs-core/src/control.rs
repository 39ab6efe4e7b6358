use std::sync::Arc;

use mcs_model::{
    AddressLookup, DesiredCount, DnsOutcome, DnsTarget, ServerStatus, TaskAddress,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{ClusterApi, CoreError, DnsApi, MetricsHandle, NoopMetrics};

/// Acknowledgement of a start or stop request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlAck {
    pub desired_count: DesiredCount,
    pub message: &'static str,
}

/// Snapshot of the server for the status surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: ServerStatus,
    pub desired_count: DesiredCount,
    pub running_tasks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<TaskAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
}

/// The four control functions over one cluster service.
///
/// Every function is safe to call repeatedly; none of them keeps state between calls.
pub struct Controller {
    cluster: Arc<dyn ClusterApi>,
    dns: Option<(DnsTarget, Arc<dyn DnsApi>)>,
    metrics: MetricsHandle,
}

impl Controller {
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self {
            cluster,
            dns: None,
            metrics: NoopMetrics::handle(),
        }
    }

    /// Enable DNS reconciliation for `target`.
    pub fn with_dns(mut self, target: DnsTarget, api: Arc<dyn DnsApi>) -> Self {
        self.dns = Some((target, api));
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn dns_target(&self) -> Option<&DnsTarget> {
        self.dns.as_ref().map(|(target, _)| target)
    }

    /// Set the desired count to one.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<ControlAck, CoreError> {
        let res = self.cluster.set_desired_count(DesiredCount::RUNNING).await;
        self.metrics.record_control("start", res.is_ok());
        res?;

        info!("desired count set to 1");
        Ok(ControlAck {
            desired_count: DesiredCount::RUNNING,
            message: "Server started",
        })
    }

    /// Set the desired count to zero.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<ControlAck, CoreError> {
        let res = self.cluster.set_desired_count(DesiredCount::STOPPED).await;
        self.metrics.record_control("stop", res.is_ok());
        res?;

        info!("desired count set to 0");
        Ok(ControlAck {
            desired_count: DesiredCount::STOPPED,
            message: "Server stopped",
        })
    }

    /// Public address of the running task, if any.
    #[instrument(skip(self))]
    pub async fn get_ip(&self) -> Result<AddressLookup, CoreError> {
        let res = self.lookup().await;
        self.metrics.record_control("get_ip", res.is_ok());
        let lookup = res?;
        debug!(?lookup, "address lookup");
        Ok(lookup)
    }

    async fn lookup(&self) -> Result<AddressLookup, CoreError> {
        let desired = self.cluster.desired_count().await?;
        if !desired.is_running() {
            return Ok(AddressLookup::NotRunning);
        }

        let tasks = self.cluster.running_tasks().await?;
        let Some(task) = tasks.into_iter().next() else {
            return Ok(AddressLookup::Pending { task: None });
        };

        Ok(match self.cluster.task_address(&task).await? {
            Some(address) => AddressLookup::Ready { task, address },
            None => AddressLookup::Pending { task: Some(task) },
        })
    }

    /// Point the server record at `address`; a no-op when DNS is disabled.
    #[instrument(skip(self))]
    pub async fn update_dns(&self, address: TaskAddress) -> Result<DnsOutcome, CoreError> {
        let Some((target, api)) = &self.dns else {
            debug!("dns integration disabled");
            return Ok(DnsOutcome::Disabled);
        };

        let res = api.upsert_record(target, address).await;
        self.metrics.record_control("update_dns", res.is_ok());
        match res {
            Ok(change) => {
                info!(record = %change.record, change_id = %change.change_id, "dns record upserted");
                Ok(DnsOutcome::Updated(change))
            }
            Err(e) => {
                warn!(error = %e, record = %target.domain_name, "dns upsert failed");
                Err(e.into())
            }
        }
    }

    /// Desired count, running tasks and, when running, the address.
    #[instrument(skip(self))]
    pub async fn status(&self) -> Result<StatusReport, CoreError> {
        let desired = self.cluster.desired_count().await?;
        let tasks = self.cluster.running_tasks().await?;
        let status = ServerStatus::derive(desired, tasks.len());

        let address = match (status, tasks.first()) {
            (ServerStatus::Running, Some(task)) => self.cluster.task_address(task).await?,
            _ => None,
        };

        Ok(StatusReport {
            status,
            desired_count: desired,
            running_tasks: tasks.len(),
            address,
            domain_name: self.dns_target().map(|t| t.domain_name.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use mcs_model::{ExecutionKind, ExecutionStatus};

    use super::*;
    use crate::{
        CloudError, CloudErrorKind, MetricsBackend,
        fake::{FakeCluster, FakeDns},
    };

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl MetricsBackend for Counting {
        fn record_control(&self, _operation: &'static str, _ok: bool) {
            self.calls.fetch_add(1, Ordering::Relaxed);
        }

        fn record_execution(&self, _: ExecutionKind, _: ExecutionStatus, _: Duration) {}
    }

    fn target() -> DnsTarget {
        DnsTarget {
            hosted_zone_id: "Z123".into(),
            domain_name: "mc.example.com".into(),
            ttl: 60,
        }
    }

    #[tokio::test]
    async fn start_stop_start_leaves_one_replica() {
        let cluster = Arc::new(FakeCluster::new());
        let ctl = Controller::new(cluster.clone());

        ctl.start().await.unwrap();
        ctl.start().await.unwrap();
        ctl.stop().await.unwrap();
        let ack = ctl.start().await.unwrap();

        assert_eq!(ack.desired_count, DesiredCount::RUNNING);
        assert_eq!(cluster.desired(), DesiredCount::RUNNING);
        assert!(cluster.task_count() <= 1);
    }

    #[tokio::test]
    async fn stop_twice_is_fine() {
        let cluster = Arc::new(FakeCluster::new());
        let ctl = Controller::new(cluster.clone());

        assert_eq!(ctl.stop().await.unwrap().message, "Server stopped");
        ctl.stop().await.unwrap();
        assert_eq!(cluster.desired(), DesiredCount::STOPPED);
    }

    #[tokio::test]
    async fn get_ip_when_stopped_is_not_an_error() {
        let ctl = Controller::new(Arc::new(FakeCluster::new()));
        assert_eq!(ctl.get_ip().await.unwrap(), AddressLookup::NotRunning);
    }

    #[tokio::test]
    async fn get_ip_goes_from_pending_to_ready() {
        let cluster = Arc::new(FakeCluster::new().address_after(2));
        let ctl = Controller::new(cluster.clone());
        ctl.start().await.unwrap();

        assert!(matches!(
            ctl.get_ip().await.unwrap(),
            AddressLookup::Pending { task: Some(_) }
        ));
        assert!(!ctl.get_ip().await.unwrap().is_ready());
        let ready = ctl.get_ip().await.unwrap();
        assert_eq!(ready.address(), Some(cluster.public_address()));
    }

    #[tokio::test]
    async fn get_ip_while_task_not_yet_placed() {
        let cluster = Arc::new(FakeCluster::new().without_tasks());
        let ctl = Controller::new(cluster);
        ctl.start().await.unwrap();

        assert_eq!(
            ctl.get_ip().await.unwrap(),
            AddressLookup::Pending { task: None }
        );
    }

    #[tokio::test]
    async fn cloud_errors_surface_unchanged() {
        let cluster = Arc::new(FakeCluster::new());
        cluster.fail_next(CloudError::new(
            "ecs",
            "UpdateService",
            CloudErrorKind::AccessDenied,
            "not allowed",
        ));
        let ctl = Controller::new(cluster);

        match ctl.start().await {
            Err(CoreError::Cloud(e)) => assert_eq!(e.kind, CloudErrorKind::AccessDenied),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_dns_disabled_sends_nothing() {
        let metrics = Arc::new(Counting::default());
        let ctl = Controller::new(Arc::new(FakeCluster::new())).with_metrics(metrics.clone());
        assert!(ctl.dns_target().is_none());

        let out = ctl.update_dns("1.2.3.4".parse().unwrap()).await.unwrap();
        assert_eq!(out, DnsOutcome::Disabled);
        assert_eq!(metrics.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn update_dns_upserts_record() {
        let dns = Arc::new(FakeDns::new());
        let ctl = Controller::new(Arc::new(FakeCluster::new())).with_dns(target(), dns.clone());

        let addr: TaskAddress = "1.2.3.4".parse().unwrap();
        let out = ctl.update_dns(addr).await.unwrap();

        let DnsOutcome::Updated(change) = out else {
            panic!("expected an update");
        };
        assert_eq!(change.record, "mc.example.com");
        assert_eq!(dns.upserts(), vec![("mc.example.com".to_string(), addr)]);
    }

    #[tokio::test]
    async fn status_reports_running_address() {
        let cluster = Arc::new(FakeCluster::new());
        let ctl = Controller::new(cluster.clone()).with_dns(target(), Arc::new(FakeDns::new()));

        let stopped = ctl.status().await.unwrap();
        assert_eq!(stopped.status, ServerStatus::Stopped);
        assert!(stopped.address.is_none());

        ctl.start().await.unwrap();
        let running = ctl.status().await.unwrap();
        assert_eq!(running.status, ServerStatus::Running);
        assert_eq!(running.running_tasks, 1);
        assert_eq!(running.address, Some(cluster.public_address()));
        assert_eq!(running.domain_name.as_deref(), Some("mc.example.com"));
    }
}
