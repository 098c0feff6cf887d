/// Package whose classes the remoting client stack needs on every round-trip.
///
/// An allowlist spec gets an implicit `org.jboss.remotingjmx.**` accept rule so
/// that an operator allowlist never locks out the client's own infrastructure.
pub const CLIENT_SUPPORT_PACKAGE: &str = "org.jboss.remotingjmx.";

/// Built-in spec used when no override is configured.
///
/// Only reject elements, so the compiled filter runs in blocklist mode and
/// admits everything else.
pub const DEFAULT_SPEC: &str = concat!(
    // commons-collections functors
    "!org.apache.commons.collections.functors.InvokerTransformer;",
    "!org.apache.commons.collections.functors.InstantiateTransformer;",
    "!org.apache.commons.collections4.functors.InvokerTransformer;",
    "!org.apache.commons.collections4.functors.InstantiateTransformer;",
    // closures and script proxies
    "!org.codehaus.groovy.runtime.ConvertedClosure;",
    "!org.codehaus.groovy.runtime.MethodClosure;",
    "!org.springframework.beans.factory.ObjectFactory;",
    "!javax.script.ScriptEngineManager;",
    // xslt templates
    "!com.sun.org.apache.xalan.internal.xsltc.trax.TemplatesImpl;",
    "!org.apache.xalan.xsltc.trax.TemplatesImpl;",
    // connection pools and jndi lookups
    "!com.mchange.v2.c3p0.WrapperConnectionPoolDataSource;",
    "!com.mchange.v2.c3p0.JndiRefForwardingDataSource;",
    "!com.sun.rowset.JdbcRowSetImpl"
);
