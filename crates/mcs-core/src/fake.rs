//! In-memory cluster and DNS zone for exercising the control plane without a cloud account.

use std::{
    net::{IpAddr, Ipv4Addr},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use mcs_model::{DesiredCount, DnsChange, DnsTarget, TaskAddress, TaskArn};

use crate::{CloudError, ClusterApi, DnsApi};

const PUBLIC_ADDRESS: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 10);

/// Service with one task slot.
///
/// Raising the desired count places a task right away (unless built with
/// [`FakeCluster::without_tasks`]); its address appears after a configurable number of lookups.
pub struct FakeCluster {
    inner: Mutex<ClusterInner>,
}

struct ClusterInner {
    desired: DesiredCount,
    task: Option<FakeTask>,
    generation: u32,
    address_after: u32,
    place_tasks: bool,
    fail_next: Option<CloudError>,
    set_calls: Vec<DesiredCount>,
}

struct FakeTask {
    arn: TaskArn,
    lookups: u32,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ClusterInner {
                desired: DesiredCount::STOPPED,
                task: None,
                generation: 0,
                address_after: 0,
                place_tasks: true,
                fail_next: None,
                set_calls: Vec::new(),
            }),
        }
    }

    /// Return no address for the first `lookups` address queries of each task.
    pub fn address_after(self, lookups: u32) -> Self {
        self.lock().address_after = lookups;
        self
    }

    /// Never place a task, as if capacity were unavailable.
    pub fn without_tasks(self) -> Self {
        self.lock().place_tasks = false;
        self
    }

    /// Fail the next call with `err`.
    pub fn fail_next(&self, err: CloudError) {
        self.lock().fail_next = Some(err);
    }

    pub fn desired(&self) -> DesiredCount {
        self.lock().desired
    }

    pub fn task_count(&self) -> usize {
        usize::from(self.lock().task.is_some())
    }

    /// Every desired count written, in order.
    pub fn set_calls(&self) -> Vec<DesiredCount> {
        self.lock().set_calls.clone()
    }

    pub fn public_address(&self) -> TaskAddress {
        TaskAddress::new(IpAddr::V4(PUBLIC_ADDRESS))
    }

    fn lock(&self) -> MutexGuard<'_, ClusterInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> Result<MutexGuard<'_, ClusterInner>, CloudError> {
        let mut inner = self.lock();
        match inner.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(inner),
        }
    }
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn set_desired_count(&self, count: DesiredCount) -> Result<(), CloudError> {
        let mut inner = self.check()?;
        inner.set_calls.push(count);
        inner.desired = count;

        if !count.is_running() {
            inner.task = None;
        } else if inner.task.is_none() && inner.place_tasks {
            inner.generation += 1;
            let arn = format!(
                "arn:aws:ecs:us-east-1:000000000000:task/fake-cluster/task{}",
                inner.generation
            );
            inner.task = Some(FakeTask {
                arn: TaskArn::from(arn),
                lookups: 0,
            });
        }
        Ok(())
    }

    async fn desired_count(&self) -> Result<DesiredCount, CloudError> {
        Ok(self.check()?.desired)
    }

    async fn running_tasks(&self) -> Result<Vec<TaskArn>, CloudError> {
        let inner = self.check()?;
        Ok(inner.task.iter().map(|t| t.arn.clone()).collect())
    }

    async fn task_address(&self, task: &TaskArn) -> Result<Option<TaskAddress>, CloudError> {
        let mut inner = self.check()?;
        let after = inner.address_after;
        let Some(current) = inner.task.as_mut().filter(|t| &t.arn == task) else {
            return Ok(None);
        };
        current.lookups += 1;
        if current.lookups > after {
            Ok(Some(self.public_address()))
        } else {
            Ok(None)
        }
    }
}

/// Zone that records every upsert.
pub struct FakeDns {
    upserts: Mutex<Vec<(String, TaskAddress)>>,
    fail_next: Mutex<Option<CloudError>>,
}

impl FakeDns {
    pub fn new() -> Self {
        Self {
            upserts: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
        }
    }

    pub fn fail_next(&self, err: CloudError) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    /// Record names and addresses upserted so far.
    pub fn upserts(&self) -> Vec<(String, TaskAddress)> {
        self.upserts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for FakeDns {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsApi for FakeDns {
    async fn upsert_record(
        &self,
        target: &DnsTarget,
        address: TaskAddress,
    ) -> Result<DnsChange, CloudError> {
        if let Some(err) = self
            .fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            return Err(err);
        }

        let mut upserts = self.upserts.lock().unwrap_or_else(PoisonError::into_inner);
        upserts.push((target.domain_name.clone(), address));
        Ok(DnsChange {
            change_id: format!("/change/FAKE{}", upserts.len()),
            record: target.domain_name.clone(),
            address,
        })
    }
}
