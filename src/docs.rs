use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use myway_auth::OrgRole;
use myway_models::analytics::{
    CourseCohort, CourseProgress, OrgMetrics, ProgressEventType, RecentAttempt, StudentMastery,
    StudentPerformance, WeakTopic,
};
use myway_models::assignments::{
    Assignment, AssignmentProgress, AssignmentWithProgress, CreateAssignmentDto,
    GradeSubmissionDto, SubmitAssignmentDto, Submission, SubmissionStatus, SubmissionWithUser,
};
use myway_models::courses::{
    Course, CourseModule, CourseWithModules, CreateCourseDto, CreateMaterialDto, CreateModuleDto,
    EnrollUserDto, EnrolledUser, Enrollment, Material, MaterialType, ModuleWithMaterials,
    ProcessingStatus, UpdateMaterialDto, UpdateModuleDto,
};
use myway_models::discussions::{CreateReplyDto, CreateThreadDto, Reply, Thread, ThreadWithReplies};
use myway_models::organizations::{
    AddMemberDto, CreateOrganizationDto, Member, Organization, OrganizationWithRole,
    UpdateMemberRoleDto,
};
use myway_models::study_packs::{
    Flashcard, FlashcardResponse, FlashcardSession, FlashcardSessionSummary,
    GenerateStudyPackDto, QuizAttempt, QuizAttemptResult, QuizContent, QuizQuestion,
    RecordFlashcardSessionDto, StudyPack, StudyPackDraft, SubmitQuizAttemptDto, SummaryContent,
    TutorRequest, TutorResponse, UpdateStudyPackDraftDto,
};
use myway_models::users::{
    LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequestDto, User, UserMembership,
    UserWithMemberships,
};

use crate::modules::auth::controller::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register_user,
        crate::modules::auth::controller::login_user,
        crate::modules::auth::controller::refresh_token,
        crate::modules::auth::controller::get_profile,
        crate::modules::organizations::controller::create_organization,
        crate::modules::organizations::controller::list_organizations,
        crate::modules::organizations::controller::get_organization,
        crate::modules::organizations::controller::delete_organization,
        crate::modules::organizations::controller::join_organization,
        crate::modules::organizations::controller::list_members,
        crate::modules::organizations::controller::add_member,
        crate::modules::organizations::controller::change_member_role,
        crate::modules::courses::controller::create_course,
        crate::modules::courses::controller::list_courses,
        crate::modules::courses::controller::get_course,
        crate::modules::courses::controller::delete_course,
        crate::modules::courses::controller::enroll_in_course,
        crate::modules::courses::controller::enroll_user,
        crate::modules::courses::controller::list_enrollments,
        crate::modules::course_modules::controller::create_module,
        crate::modules::course_modules::controller::list_modules,
        crate::modules::course_modules::controller::update_module,
        crate::modules::course_modules::controller::delete_module,
        crate::modules::materials::controller::create_material,
        crate::modules::materials::controller::list_materials,
        crate::modules::materials::controller::get_material,
        crate::modules::materials::controller::update_material,
        crate::modules::materials::controller::delete_material,
        crate::modules::assignments::controller::create_assignment,
        crate::modules::assignments::controller::list_assignments,
        crate::modules::assignments::controller::get_assignment,
        crate::modules::assignments::controller::submit_assignment,
        crate::modules::assignments::controller::list_submissions,
        crate::modules::assignments::controller::grade_submission,
        crate::modules::discussions::controller::list_threads,
        crate::modules::discussions::controller::create_thread,
        crate::modules::discussions::controller::get_thread,
        crate::modules::discussions::controller::reply_to_thread,
        crate::modules::analytics::controller::my_mastery,
        crate::modules::analytics::controller::teacher_cohort,
        crate::modules::analytics::controller::org_metrics,
        crate::modules::analytics::controller::course_progress,
        crate::modules::analytics::controller::org_progress,
        crate::modules::study_packs::controller::generate_study_pack,
        crate::modules::study_packs::controller::get_study_pack,
        crate::modules::study_packs::controller::get_study_pack_draft,
        crate::modules::study_packs::controller::update_study_pack_draft,
        crate::modules::study_packs::controller::approve_study_pack,
        crate::modules::study_packs::controller::record_quiz_attempt,
        crate::modules::study_packs::controller::record_flashcard_session,
        crate::modules::study_packs::controller::my_flashcard_sessions,
        crate::modules::study_packs::controller::tutor,
    ),
    components(
        schemas(
            ErrorResponse,
            OrgRole,
            User,
            UserMembership,
            UserWithMemberships,
            RegisterRequestDto,
            LoginRequest,
            LoginResponse,
            RefreshTokenRequest,
            Organization,
            OrganizationWithRole,
            Member,
            CreateOrganizationDto,
            AddMemberDto,
            UpdateMemberRoleDto,
            Course,
            CourseWithModules,
            CourseModule,
            ModuleWithMaterials,
            Material,
            MaterialType,
            ProcessingStatus,
            Enrollment,
            EnrolledUser,
            CreateCourseDto,
            EnrollUserDto,
            CreateModuleDto,
            UpdateModuleDto,
            CreateMaterialDto,
            UpdateMaterialDto,
            Assignment,
            AssignmentProgress,
            AssignmentWithProgress,
            Submission,
            SubmissionStatus,
            SubmissionWithUser,
            CreateAssignmentDto,
            SubmitAssignmentDto,
            GradeSubmissionDto,
            Thread,
            Reply,
            ThreadWithReplies,
            CreateThreadDto,
            CreateReplyDto,
            StudyPack,
            StudyPackDraft,
            GenerateStudyPackDto,
            UpdateStudyPackDraftDto,
            SummaryContent,
            QuizContent,
            QuizQuestion,
            Flashcard,
            QuizAttempt,
            QuizAttemptResult,
            SubmitQuizAttemptDto,
            FlashcardResponse,
            FlashcardSession,
            FlashcardSessionSummary,
            RecordFlashcardSessionDto,
            TutorRequest,
            TutorResponse,
            StudentMastery,
            RecentAttempt,
            CourseCohort,
            StudentPerformance,
            OrgMetrics,
            WeakTopic,
            CourseProgress,
            ProgressEventType,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and token refresh"),
        (name = "Organizations", description = "Organizations and their memberships"),
        (name = "Courses", description = "Courses and enrollments"),
        (name = "Modules", description = "Ordered course modules"),
        (name = "Materials", description = "Learning materials inside modules"),
        (name = "Assignments", description = "Assignments, submissions and grading"),
        (name = "Discussions", description = "Course discussion threads and replies"),
        (name = "Analytics", description = "Mastery, cohort, organization metrics and course progress"),
        (name = "AI", description = "Study packs and their review, practice records and the course tutor")
    ),
    info(
        title = "MyWay API",
        version = "0.1.0",
        description = "Learning management backend with organization-scoped roles and AI study packs.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| *p == "/api/auth/login"));
        assert!(paths.iter().any(|p| *p == "/api/submissions/{id}/grade"));
        assert!(paths.iter().any(|p| *p == "/api/ai/tutor"));
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
