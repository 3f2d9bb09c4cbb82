//! Kubernetes client wrapper for the QE harness

use std::fmt::Debug;
use std::time::Duration;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Namespace, Node, Pod, Service};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::{
    api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    discovery::ApiResource,
    Client, Config, Resource,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, instrument};

use super::wait::{
    daemonset_is_ready, deployment_is_ready, pod_is_ready, poll_until, statefulset_is_ready,
};
use crate::error::{QeError, Result};

/// Wrapper around kube::Client with the create/wait/delete helpers scenarios need
#[derive(Clone)]
pub struct K8sClient {
    client: Client,
    poll_interval: Duration,
}

/// Background propagation for every delete issued by the harness
pub(crate) fn delete_params() -> DeleteParams {
    DeleteParams::background()
}

impl K8sClient {
    /// Connect using the default kubeconfig or in-cluster config
    #[instrument(skip_all)]
    pub async fn new() -> Result<Self> {
        let config = Config::infer().await?;
        let client = Client::try_from(config)?;

        info!("Connected to Kubernetes cluster");

        Ok(Self::from_client(client))
    }

    /// Connect using an explicit kubeconfig file
    #[instrument]
    pub async fn from_kubeconfig(path: &str) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path)?;
        let config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        let client = Client::try_from(config)?;

        info!("Connected to Kubernetes cluster");

        Ok(Self::from_client(client))
    }

    /// Wrap an existing client
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            poll_interval: Duration::from_secs(5),
        }
    }

    /// Interval used by every readiness wait
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Get the inner kube Client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Typed API for a namespaced kind
    pub fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Typed API for a cluster-scoped kind
    pub fn cluster<K>(&self) -> Api<K>
    where
        K: Resource<Scope = ClusterResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::all(self.client.clone())
    }

    /// Create any namespaced object
    #[instrument(skip(self, obj), fields(name = %obj.meta().name.as_deref().unwrap_or("unknown")))]
    pub async fn create<K>(&self, namespace: &str, obj: &K) -> Result<K>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + Serialize + DeserializeOwned,
        <K as Resource>::DynamicType: Default,
    {
        let created = self
            .namespaced::<K>(namespace)
            .create(&PostParams::default(), obj)
            .await?;
        info!(kind = %K::kind(&Default::default()), namespace, "Created resource");
        Ok(created)
    }

    /// Create any cluster-scoped object
    #[instrument(skip(self, obj), fields(name = %obj.meta().name.as_deref().unwrap_or("unknown")))]
    pub async fn create_cluster<K>(&self, obj: &K) -> Result<K>
    where
        K: Resource<Scope = ClusterResourceScope> + Clone + Debug + Serialize + DeserializeOwned,
        <K as Resource>::DynamicType: Default,
    {
        let created = self.cluster::<K>().create(&PostParams::default(), obj).await?;
        info!(kind = %K::kind(&Default::default()), "Created cluster resource");
        Ok(created)
    }

    /// Get a namespaced object by name
    pub async fn get<K>(&self, namespace: &str, name: &str) -> Result<K>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + DeserializeOwned,
        <K as Resource>::DynamicType: Default,
    {
        Ok(self.namespaced::<K>(namespace).get(name).await?)
    }

    /// Delete a namespaced object, treating 404 as success
    #[instrument(skip(self))]
    pub async fn delete<K>(&self, namespace: &str, name: &str) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + DeserializeOwned,
        <K as Resource>::DynamicType: Default,
    {
        match self
            .namespaced::<K>(namespace)
            .delete(name, &delete_params())
            .await
        {
            Ok(_) => {
                info!(name, namespace, "Deleted resource");
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 404 => {
                debug!(name, namespace, "Resource already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a cluster-scoped object, treating 404 as success
    #[instrument(skip(self))]
    pub async fn delete_cluster<K>(&self, name: &str) -> Result<()>
    where
        K: Resource<Scope = ClusterResourceScope> + Clone + Debug + DeserializeOwned,
        <K as Resource>::DynamicType: Default,
    {
        match self
            .cluster::<K>()
            .delete(name, &delete_params())
            .await
        {
            Ok(_) => {
                info!(name, "Deleted cluster resource");
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a custom object through a discovered or hand-written ApiResource
    #[instrument(skip(self, obj), fields(kind = %ar.kind))]
    pub async fn create_dynamic(
        &self,
        namespace: Option<&str>,
        ar: &ApiResource,
        obj: &DynamicObject,
    ) -> Result<DynamicObject> {
        let api = self.dynamic_api(namespace, ar);
        let created = api.create(&PostParams::default(), obj).await?;
        info!(
            name = %created.metadata.name.as_deref().unwrap_or("unknown"),
            "Created custom resource"
        );
        Ok(created)
    }

    /// List custom objects of one kind
    pub async fn list_dynamic(
        &self,
        namespace: Option<&str>,
        ar: &ApiResource,
    ) -> Result<Vec<DynamicObject>> {
        let list = self
            .dynamic_api(namespace, ar)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    /// Get a custom object, `None` when it does not exist
    pub async fn get_dynamic(
        &self,
        namespace: Option<&str>,
        ar: &ApiResource,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        Ok(self.dynamic_api(namespace, ar).get_opt(name).await?)
    }

    /// Apply a JSON merge patch to a custom object
    #[instrument(skip(self, patch), fields(kind = %ar.kind))]
    pub async fn patch_dynamic(
        &self,
        namespace: Option<&str>,
        ar: &ApiResource,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<DynamicObject> {
        let patched = self
            .dynamic_api(namespace, ar)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        debug!(name, "Patched custom resource");
        Ok(patched)
    }

    /// Delete a custom object, treating 404 as success
    pub async fn delete_dynamic(
        &self,
        namespace: Option<&str>,
        ar: &ApiResource,
        name: &str,
    ) -> Result<()> {
        match self
            .dynamic_api(namespace, ar)
            .delete(name, &delete_params())
            .await
        {
            Ok(_) => {
                info!(name, kind = %ar.kind, "Deleted custom resource");
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn dynamic_api(&self, namespace: Option<&str>, ar: &ApiResource) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, ar),
            None => Api::all_with(self.client.clone(), ar),
        }
    }

    /// Create a deployment and block until all replicas are ready
    pub async fn create_deployment_and_wait(
        &self,
        deployment: &Deployment,
        timeout: Duration,
    ) -> Result<Deployment> {
        let namespace = namespace_of(deployment)?;
        let name = name_of(deployment)?;
        self.create(&namespace, deployment).await?;
        self.wait_for_deployment_ready(&namespace, &name, timeout).await?;
        self.get(&namespace, &name).await
    }

    /// Create a daemonset and block until it is ready on every scheduled node
    pub async fn create_daemonset_and_wait(
        &self,
        daemonset: &DaemonSet,
        timeout: Duration,
    ) -> Result<DaemonSet> {
        let namespace = namespace_of(daemonset)?;
        let name = name_of(daemonset)?;
        self.create(&namespace, daemonset).await?;
        self.wait_for_daemonset_ready(&namespace, &name, timeout).await?;
        self.get(&namespace, &name).await
    }

    /// Create a statefulset and block until all replicas are ready
    pub async fn create_statefulset_and_wait(
        &self,
        statefulset: &StatefulSet,
        timeout: Duration,
    ) -> Result<StatefulSet> {
        let namespace = namespace_of(statefulset)?;
        let name = name_of(statefulset)?;
        self.create(&namespace, statefulset).await?;
        self.wait_for_statefulset_ready(&namespace, &name, timeout)
            .await?;
        self.get(&namespace, &name).await
    }

    /// Create a pod and block until it is running with all containers ready
    pub async fn create_pod_and_wait(&self, pod: &Pod, timeout: Duration) -> Result<Pod> {
        let namespace = namespace_of(pod)?;
        let name = name_of(pod)?;
        self.create(&namespace, pod).await?;
        self.wait_for_pod_ready(&namespace, &name, timeout).await?;
        self.get(&namespace, &name).await
    }

    pub async fn create_service(&self, service: &Service) -> Result<Service> {
        let namespace = namespace_of(service)?;
        self.create(&namespace, service).await
    }

    pub async fn create_pod_disruption_budget(
        &self,
        pdb: &PodDisruptionBudget,
    ) -> Result<PodDisruptionBudget> {
        let namespace = namespace_of(pdb)?;
        self.create(&namespace, pdb).await
    }

    pub async fn wait_for_deployment_ready(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<()> {
        let api: Api<Deployment> = self.namespaced(namespace);
        let api = &api;
        poll_until(
            self.poll_interval,
            timeout,
            &format!("deployment {}/{}", namespace, name),
            move || async move {
                Ok::<_, QeError>(deployment_is_ready(&api.get(name).await?))
            },
        )
        .await
    }

    pub async fn wait_for_daemonset_ready(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<()> {
        let api: Api<DaemonSet> = self.namespaced(namespace);
        let api = &api;
        poll_until(
            self.poll_interval,
            timeout,
            &format!("daemonset {}/{}", namespace, name),
            move || async move {
                Ok::<_, QeError>(daemonset_is_ready(&api.get(name).await?))
            },
        )
        .await
    }

    pub async fn wait_for_statefulset_ready(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<()> {
        let api: Api<StatefulSet> = self.namespaced(namespace);
        let api = &api;
        poll_until(
            self.poll_interval,
            timeout,
            &format!("statefulset {}/{}", namespace, name),
            move || async move {
                Ok::<_, QeError>(statefulset_is_ready(&api.get(name).await?))
            },
        )
        .await
    }

    pub async fn wait_for_pod_ready(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<()> {
        let api: Api<Pod> = self.namespaced(namespace);
        let api = &api;
        poll_until(
            self.poll_interval,
            timeout,
            &format!("pod {}/{}", namespace, name),
            move || async move {
                Ok::<_, QeError>(pod_is_ready(&api.get(name).await?))
            },
        )
        .await
    }

    /// Wait until a pod no longer exists
    pub async fn wait_for_pod_deletion(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<()> {
        let api: Api<Pod> = self.namespaced(namespace);
        let api = &api;
        poll_until(
            self.poll_interval,
            timeout,
            &format!("deletion of pod {}/{}", namespace, name),
            move || async move {
                Ok::<_, QeError>(api.get_opt(name).await?.is_none())
            },
        )
        .await
    }

    /// List pods with a label selector
    pub async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        let list = self
            .namespaced::<Pod>(namespace)
            .list(&ListParams::default().labels(label_selector))
            .await?;
        Ok(list.items)
    }

    /// List cluster nodes, optionally filtered by label
    pub async fn list_nodes(&self, label_selector: Option<&str>) -> Result<Vec<Node>> {
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        Ok(self.cluster::<Node>().list(&params).await?.items)
    }

    /// Delete every workload kind the suites create inside one namespace
    #[instrument(skip(self))]
    pub async fn clean_namespace(&self, namespace: &str) -> Result<()> {
        let dp = delete_params();
        let lp = ListParams::default();

        self.namespaced::<Deployment>(namespace)
            .delete_collection(&dp, &lp)
            .await?;
        self.namespaced::<DaemonSet>(namespace)
            .delete_collection(&dp, &lp)
            .await?;
        self.namespaced::<StatefulSet>(namespace)
            .delete_collection(&dp, &lp)
            .await?;
        self.namespaced::<Pod>(namespace)
            .delete_collection(&dp, &lp)
            .await?;
        self.namespaced::<PodDisruptionBudget>(namespace)
            .delete_collection(&dp, &lp)
            .await?;

        // Services do not support deletecollection on older API servers
        let services = self.namespaced::<Service>(namespace).list(&lp).await?;
        for svc in services.items {
            if let Some(name) = svc.metadata.name {
                self.delete::<Service>(namespace, &name).await?;
            }
        }

        info!(namespace, "Cleaned namespace");
        Ok(())
    }

    /// Delete CRDs whose name ends with the given suffix
    pub async fn delete_crds_with_suffix(&self, suffix: &str) -> Result<()> {
        let crds = self
            .cluster::<CustomResourceDefinition>()
            .list(&ListParams::default())
            .await?;
        for crd in crds.items {
            if let Some(name) = crd.metadata.name.filter(|n| n.ends_with(suffix)) {
                self.delete_cluster::<CustomResourceDefinition>(&name)
                    .await?;
            }
        }
        Ok(())
    }

    /// Check if cluster is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let version = self.client.apiserver_version().await?;
        info!(version = %version.git_version, "Kubernetes cluster is healthy");
        Ok(true)
    }

    /// Namespaces API
    pub(crate) fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }
}

fn namespace_of<K: Resource>(obj: &K) -> Result<String> {
    obj.meta()
        .namespace
        .clone()
        .ok_or(QeError::MissingField("metadata.namespace"))
}

fn name_of<K: Resource>(obj: &K) -> Result<String> {
    obj.meta()
        .name
        .clone()
        .ok_or(QeError::MissingField("metadata.name"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::PropagationPolicy;

    #[test]
    fn test_deletes_propagate_in_background() {
        let dp = delete_params();
        assert!(matches!(
            dp.propagation_policy,
            Some(PropagationPolicy::Background)
        ));
        assert!(!dp.dry_run);
    }
}
